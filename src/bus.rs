//! Register access seam between the tuning engine and the platform.
//!
//! The engine never touches MMIO directly; everything goes through [`SdhiBus`]
//! so the platform integration decides how the two register windows are mapped
//! and how the microsecond-scale poll delay is produced. [`MmioBus`] is the
//! stock implementation for memory-mapped controllers.

use core::marker::PhantomData;
use core::ptr;

use embedded_hal_1::delay::DelayNs;

use crate::regs;

/// Raw register access to the SDHI control block and the SCC block.
///
/// Offsets are the byte offsets from [`crate::regs`]; implementations scale
/// them by the per-device register spacing.
pub trait SdhiBus {
    fn ctl_read16(&mut self, offset: u32) -> u16;
    fn ctl_write16(&mut self, offset: u32, val: u16);

    fn scc_read32(&mut self, offset: u32) -> u32;
    fn scc_write32(&mut self, offset: u32, val: u32);

    /// Busy-wait for `us` microseconds between status polls.
    fn delay_us(&mut self, us: u32);

    /// Read `CTL_STATUS` as two 16-bit halves combined into one word.
    fn ctl_read_status(&mut self) -> u32 {
        u32::from(self.ctl_read16(regs::CTL_STATUS))
            | (u32::from(self.ctl_read16(regs::CTL_STATUS + 2)) << 16)
    }

    /// Write `CTL_STATUS` as two 16-bit halves.
    fn ctl_write_status(&mut self, val: u32) {
        self.ctl_write16(regs::CTL_STATUS, val as u16);
        self.ctl_write16(regs::CTL_STATUS + 2, (val >> 16) as u16);
    }
}

/// [`SdhiBus`] over two memory-mapped register windows.
///
/// `bus_shift` selects the register spacing: 0 for 2-byte spaced registers,
/// 1 for 4-byte, 2 for 8-byte.
pub struct MmioBus<D: DelayNs> {
    ctl: *mut u8,
    scc: *mut u8,
    bus_shift: u8,
    delay: D,
    _not_sync: PhantomData<*mut ()>,
}

impl<D: DelayNs> MmioBus<D> {
    /// Create a bus over the control block at `ctl` and the SCC block at
    /// `scc` (usually `ctl + scc_offset` from the device data).
    ///
    /// # Safety
    ///
    /// Both pointers must stay valid and mapped for the lifetime of the bus,
    /// and nothing else may access the two windows while it exists.
    pub unsafe fn new(ctl: *mut u8, scc: *mut u8, bus_shift: u8, delay: D) -> Self {
        Self {
            ctl,
            scc,
            bus_shift,
            delay,
            _not_sync: PhantomData,
        }
    }

    fn ctl_ptr(&self, offset: u32) -> *mut u16 {
        let off = (offset as usize) << self.bus_shift;
        self.ctl.wrapping_add(off) as *mut u16
    }

    fn scc_ptr(&self, offset: u32) -> *mut u32 {
        let off = (offset as usize) << self.bus_shift;
        self.scc.wrapping_add(off) as *mut u32
    }
}

impl<D: DelayNs> SdhiBus for MmioBus<D> {
    fn ctl_read16(&mut self, offset: u32) -> u16 {
        unsafe { ptr::read_volatile(self.ctl_ptr(offset)) }
    }

    fn ctl_write16(&mut self, offset: u32, val: u16) {
        unsafe { ptr::write_volatile(self.ctl_ptr(offset), val) }
    }

    fn scc_read32(&mut self, offset: u32) -> u32 {
        unsafe { ptr::read_volatile(self.scc_ptr(offset)) }
    }

    fn scc_write32(&mut self, offset: u32, val: u32) {
        unsafe { ptr::write_volatile(self.scc_ptr(offset), val) }
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}
