use embassy_stm32::Peri;
use embassy_stm32::flash::{Blocking, Error as FlashError, FLASH_SIZE, Flash};
use embassy_stm32::peripherals::FLASH;

use crate::store::{FlashBank, Page, SLOT_SIZE};

/// Erase granularity of the STM32G0B1.
pub const PAGE_SIZE: u32 = 2 * 1024;

/// The last two pages of flash, reserved for the attempt budget.
#[allow(clippy::cast_possible_truncation)]
pub const STORE_OFFSET: u32 = FLASH_SIZE as u32 - 2 * PAGE_SIZE;

pub struct BudgetBank<'d> {
    flash: Flash<'d, Blocking>,
}

impl<'d> BudgetBank<'d> {
    pub fn new(flash: Peri<'d, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
        }
    }
}

const fn page_offset(page: Page) -> u32 {
    STORE_OFFSET + page.index() * PAGE_SIZE
}

impl FlashBank for BudgetBank<'_> {
    type Error = FlashError;

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn read(&mut self, page: Page, offset: u32, bytes: &mut [u8]) -> Result<(), FlashError> {
        self.flash.blocking_read(page_offset(page) + offset, bytes)
    }

    fn write(&mut self, page: Page, offset: u32, bytes: &[u8; SLOT_SIZE]) -> Result<(), FlashError> {
        self.flash.blocking_write(page_offset(page) + offset, bytes)
    }

    fn erase(&mut self, page: Page) -> Result<(), FlashError> {
        let start = page_offset(page);
        self.flash.blocking_erase(start, start + PAGE_SIZE)
    }
}
