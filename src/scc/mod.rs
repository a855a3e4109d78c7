//! SCC (Sampling Clock Controller) driver: tap tuning, runtime drift
//! correction and HS400 calibration.
//!
//! The session layer drives the tuning cycle: [`Scc::begin_tuning`], then one
//! [`Scc::prepare_probe`] + tuning command per probe index (recording the
//! outcome in a [`TapBitmap`]), then [`Scc::run_tuning`] to pick the tap.
//! During transfer it polls [`Scc::check_drift`] and schedules a fresh tuning
//! cycle when that returns [`DriftEvent::RetuneRequired`].

use crate::bus::SdhiBus;
use crate::quirks::SdhiQuirks;
use crate::regs;

mod window;
pub use window::TapBitmap;


/// Tap count programmed into DTCNTL for tuning.
const TAPNUM_TUNING: u32 = 8;
/// Tap count programmed into DTCNTL for HS400.
const TAPNUM_HS400: u32 = 4;

/// Status polls allowed per protected register write.
const IDLE_POLL_BUDGET: u32 = 1000;

/// SCC driver error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A protected register write did not settle within the poll budget.
    IdleTimeout,
    /// Tuning found no stable run of passing taps.
    NoStableWindow,
    /// No tap-timing entry matched the negotiated clock rate; tuning is
    /// unavailable on this instance.
    UnknownClockRate,
}

/// Outcome of one drift-check poll.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriftEvent {
    /// No timing error observed.
    NoError,
    /// Tap nudged up by one; transfer continues.
    TapUp,
    /// Tap nudged down by one; transfer continues.
    TapDown,
    /// Drift exceeded what tap nudging can fix; the caller should schedule a
    /// fresh tuning cycle. Advisory, the current transfer is not aborted.
    RetuneRequired,
}

/// Bus timing mode, as negotiated by the session layer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timing {
    Legacy,
    HighSpeed,
    Sdr50,
    Sdr104,
    Hs200,
    Hs400,
}

/// Fixed sampling-point values (DT2FF) for one bus clock rate.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapTiming {
    /// Clock rate this entry applies to; 0 matches any rate.
    pub clk_rate: u32,
    pub tap: u32,
    /// Used instead of `tap` for HS400 on 4-tap silicon.
    pub tap_hs400_4tap: u32,
}

/// Attach-time configuration.
#[non_exhaustive]
#[derive(Debug, Copy, Clone)]
pub struct Config {
    /// Negotiated maximum bus clock rate in Hz, used to select the
    /// tap-timing entry.
    pub max_rate: u32,
    /// Port index selecting the calibration-table variant (0 or 1).
    pub port: u8,
    /// Whether the controller has the CBSY status bit. One Gen2 incarnation
    /// ([`regs::VER_GEN2_SDR50`]) does not.
    pub has_cbsy: bool,
    /// Initial bus timing mode.
    pub timing: Timing,
    /// Tap-timing table from the device data.
    pub taps: &'static [TapTiming],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_rate: 0,
            port: 0,
            has_cbsy: true,
            timing: Timing::Legacy,
            taps: &[],
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
struct TapPositions {
    sdr: u32,
    hs400: u32,
}

/// SCC tuning and calibration engine over an [`SdhiBus`].
///
/// All methods assume the caller already holds the host exclusion; nothing
/// here locks, and waiting is only the bounded busy-poll of the protected
/// register writes.
pub struct Scc<B: SdhiBus> {
    bus: B,
    quirks: Option<&'static SdhiQuirks>,
    /// Calibration-table variant for this port, `None` when the silicon
    /// needs no manual calibration.
    calib_table: Option<&'static [u32; crate::quirks::CALIB_TABLE_MAX]>,
    calib_offset: u32,
    version: u16,
    has_cbsy: bool,
    timing: Timing,
    /// `None` when no tap-timing entry matched the clock rate; all tuning
    /// entry points then fail with [`Error::UnknownClockRate`].
    tappos: Option<TapPositions>,
    tap_num: u8,
    tap_set: u8,
    doing_tune: bool,
    needs_adjust_hs400: bool,
    hs400_allowed: bool,
}

impl<B: SdhiBus> Scc<B> {
    /// Attach to a controller. Quirks come from
    /// [`crate::quirks::for_soc`]; `None` means a well-behaved part.
    pub fn new(mut bus: B, quirks: Option<&'static SdhiQuirks>, config: Config) -> Self {
        let version = bus.ctl_read16(regs::CTL_VERSION);
        let use_4tap = quirks.map_or(false, |q| q.hs400_4taps);

        let mut tappos = None;
        for t in config.taps {
            if t.clk_rate == 0 || t.clk_rate == config.max_rate {
                tappos = Some(TapPositions {
                    sdr: t.tap,
                    hs400: if use_4tap { t.tap_hs400_4tap } else { t.tap },
                });
                break;
            }
        }
        if !config.taps.is_empty() && tappos.is_none() {
            warn!("unknown clock rate {} Hz, tuning disabled", config.max_rate);
        }

        let mut calib_table = None;
        let mut calib_offset = 0;
        if let Some(q) = quirks {
            if q.hs400_manual_calib {
                if let Some(table) = q.hs400_calib_table {
                    calib_table = Some(&table[usize::from(config.port != 0)]);
                    calib_offset = q.hs400_offset & regs::SCC_TMPPORT3_OFFSET_MASK;
                }
            }
        }

        let hs400_allowed = quirks.map_or(true, |q| !q.hs400_disabled);
        if !hs400_allowed {
            debug!("HS400 disabled for this silicon revision");
        }
        debug!("SDHI version 0x{:04x}", version);

        Self {
            bus,
            quirks,
            calib_table,
            calib_offset,
            version,
            has_cbsy: config.has_cbsy,
            timing: config.timing,
            tappos,
            tap_num: 0,
            tap_set: 0,
            doing_tune: false,
            needs_adjust_hs400: false,
            hs400_allowed,
        }
    }

    /// Currently programmed sampling tap.
    pub fn tap_set(&self) -> u8 {
        self.tap_set
    }

    /// Tap count reported by the controller, 0 before the first tuning cycle.
    pub fn tap_num(&self) -> u8 {
        self.tap_num
    }

    /// Whether a tap-timing entry matched the clock rate at attach.
    pub fn tuning_available(&self) -> bool {
        self.tappos.is_some()
    }

    /// Whether HS400 survived the quirk screen at attach.
    pub fn hs400_supported(&self) -> bool {
        self.hs400_allowed
    }

    pub fn quirks(&self) -> Option<&'static SdhiQuirks> {
        self.quirks
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Record the bus timing mode negotiated by the session layer; gates
    /// whether drift checks run.
    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
    }

    /// DAT0 low means the card is holding the bus busy.
    pub fn card_busy(&mut self) -> bool {
        self.bus.ctl_read_status() & regs::STAT_DAT0 == 0
    }

    fn use_4tap(&self) -> bool {
        self.quirks.map_or(false, |q| q.hs400_4taps)
    }

    // ---- Protected register writes ----

    /// Write a bus-state-sensitive control register, then wait for the bus
    /// to go idle before anything else touches the controller. Registers
    /// outside the protected set are written through directly.
    ///
    /// An [`Error::IdleTimeout`] aborts the in-flight sequence; it is never
    /// retried here.
    pub fn ctl_write_protected(&mut self, offset: u32, val: u16) -> Result<(), Error> {
        self.bus.ctl_write16(offset, val);
        match offset {
            regs::CTL_SD_CMD
            | regs::CTL_STOP_INTERNAL_ACTION
            | regs::CTL_XFER_BLK_COUNT
            | regs::CTL_SD_XFER_LEN
            | regs::CTL_SD_MEM_CARD_OPT
            | regs::CTL_TRANSACTION_CTL
            | regs::CTL_DMA_ENABLE
            | regs::CTL_HOST_MODE => {
                let bit = if self.has_cbsy {
                    regs::STAT_CMD_BUSY
                } else {
                    regs::STAT_SCLKDIVEN
                };
                self.wait_idle(bit)
            }
            regs::CTL_SD_CARD_CLK_CTL => self.wait_idle(regs::STAT_SCLKDIVEN),
            _ => Ok(()),
        }
    }

    fn wait_idle(&mut self, bit: u32) -> Result<(), Error> {
        // CBSY is set while busy, SCLKDIVEN is cleared while busy.
        let busy_state = if bit == regs::STAT_CMD_BUSY { bit } else { 0 };

        for _ in 0..IDLE_POLL_BUDGET {
            if self.bus.ctl_read_status() & bit != busy_state {
                return Ok(());
            }
            self.bus.delay_us(1);
        }

        warn!("timeout waiting for SD bus idle");
        Err(Error::IdleTimeout)
    }

    fn sd_clock_stop(&mut self) -> Result<(), Error> {
        let ctl = self.bus.ctl_read16(regs::CTL_SD_CARD_CLK_CTL);
        self.ctl_write_protected(regs::CTL_SD_CARD_CLK_CTL, ctl & !regs::CLK_CTL_SCLKEN)
    }

    fn sd_clock_start(&mut self) -> Result<(), Error> {
        let ctl = self.bus.ctl_read16(regs::CTL_SD_CARD_CLK_CTL);
        self.ctl_write_protected(regs::CTL_SD_CARD_CLK_CTL, ctl | regs::CLK_CTL_SCLKEN)
    }

    fn scc_set_bits(&mut self, offset: u32, bits: u32) {
        let val = self.bus.scc_read32(offset);
        self.bus.scc_write32(offset, val | bits);
    }

    fn scc_clear_bits(&mut self, offset: u32, bits: u32) {
        let val = self.bus.scc_read32(offset);
        self.bus.scc_write32(offset, val & !bits);
    }

    // ---- Tuning cycle ----

    /// Initialize the SCC for a tuning cycle and return the tap count the
    /// hardware reports (probe indices run to twice that).
    pub fn begin_tuning(&mut self) -> Result<u8, Error> {
        let Some(tappos) = self.tappos else {
            return Err(Error::UnknownClockRate);
        };

        self.bus.ctl_write_status(0);
        self.sd_clock_stop()?;

        // Set the sampling clock selection range.
        self.bus.scc_write32(
            regs::SCC_DTCNTL,
            regs::SCC_DTCNTL_TAPEN | (TAPNUM_TUNING << regs::SCC_DTCNTL_TAPNUM_SHIFT),
        );
        self.scc_set_bits(regs::SCC_CKSEL, regs::SCC_CKSEL_DTSEL);
        self.scc_clear_bits(regs::SCC_RVSCNTL, regs::SCC_RVSCNTL_RVSEN);
        self.bus.scc_write32(regs::SCC_DT2FF, tappos.sdr);

        self.sd_clock_start()?;

        let tap_num = (self.bus.scc_read32(regs::SCC_DTCNTL) >> regs::SCC_DTCNTL_TAPNUM_SHIFT)
            & regs::SCC_DTCNTL_TAPNUM_MASK;
        self.tap_num = tap_num as u8;
        Ok(self.tap_num)
    }

    /// Program the tap position for the next tuning probe. Suspends drift
    /// checks until [`Scc::run_tuning`].
    pub fn prepare_probe(&mut self, tap: u32) {
        self.doing_tune = true;
        self.bus.scc_write32(regs::SCC_TAPSET, tap);
    }

    /// Select and program the sampling tap from a completed probe bitmap.
    ///
    /// One-shot: on [`Error::NoStableWindow`] the caller falls back to a
    /// slower bus mode; nothing is retried here.
    ///
    /// Panics if the bitmap was not built for the tap count returned by
    /// [`Scc::begin_tuning`].
    pub fn run_tuning(&mut self, taps: &mut TapBitmap) -> Result<u8, Error> {
        assert_eq!(taps.tap_num(), self.tap_num);

        self.doing_tune = false;
        self.needs_adjust_hs400 = false;

        self.bus.scc_write32(regs::SCC_RVSREQ, 0);

        // The tuning command ran twice per tap; a tap counts only if both
        // probes passed.
        window::merge_probe_pairs(taps);

        let win = window::longest_run(taps);
        if win.count < window::MIN_TAP_RUN {
            warn!("no stable tuning window (best run {})", win.count);
            return Err(Error::NoStableWindow);
        }

        self.tap_set = window::center_tap(&win, taps.tap_num());
        self.bus
            .scc_write32(regs::SCC_TAPSET, u32::from(self.tap_set));

        // Hardware auto-correction is the default drift handling from here.
        self.scc_set_bits(regs::SCC_RVSCNTL, regs::SCC_RVSCNTL_RVSEN);

        debug!(
            "tuning window [{}, {}], tap {}",
            win.start, win.end, self.tap_set
        );
        Ok(self.tap_set)
    }

    // ---- Drift correction ----

    /// Poll for sampling drift during active transfer.
    ///
    /// Runs only in the retunable timing modes and never while a tuning
    /// cycle is in progress. [`DriftEvent::RetuneRequired`] is advisory; the
    /// session layer schedules the fresh tuning cycle.
    pub fn check_drift(&mut self) -> DriftEvent {
        let use_4tap = self.use_4tap();

        if !(self.timing == Timing::Sdr104)
            && !(self.timing == Timing::Hs200)
            && !(self.timing == Timing::Hs400 && !use_4tap)
        {
            return DriftEvent::NoError;
        }

        if self.doing_tune || self.tap_num == 0 {
            return DriftEvent::NoError;
        }

        if self.bus.scc_read32(regs::SCC_RVSCNTL) & regs::SCC_RVSCNTL_RVSEN != 0 {
            self.auto_correction()
        } else {
            self.manual_correction(use_4tap)
        }
    }

    fn auto_correction(&mut self) -> DriftEvent {
        if self.bus.scc_read32(regs::SCC_RVSREQ) & regs::SCC_RVSREQ_RVSERR != 0 {
            self.bus.scc_write32(regs::SCC_RVSREQ, 0);
            return DriftEvent::RetuneRequired;
        }

        DriftEvent::NoError
    }

    fn manual_correction(&mut self, use_4tap: bool) -> DriftEvent {
        let val = self.bus.scc_read32(regs::SCC_RVSREQ);
        if val == 0 {
            return DriftEvent::NoError;
        }

        self.bus.scc_write32(regs::SCC_RVSREQ, 0);

        let event;
        if self.version == regs::VER_GEN3_SDMMC && self.timing == Timing::Hs400 {
            // With HS400, the DAT signal is based on DS, not CLK. Therefore,
            // use only the CMD comparison status.
            let smpcmp = self.bus.scc_read32(regs::SCC_SMPCMP) & regs::SCC_SMPCMP_CMD_ERR;
            if smpcmp == 0 {
                return DriftEvent::NoError;
            } else if smpcmp == regs::SCC_SMPCMP_CMD_REQUP {
                event = DriftEvent::TapUp;
            } else if smpcmp == regs::SCC_SMPCMP_CMD_REQDOWN {
                event = DriftEvent::TapDown;
            } else {
                return DriftEvent::RetuneRequired;
            }
        } else if val & regs::SCC_RVSREQ_RVSERR != 0 {
            return DriftEvent::RetuneRequired;
        } else if val & regs::SCC_RVSREQ_REQTAPUP != 0 {
            event = DriftEvent::TapUp;
        } else if val & regs::SCC_RVSREQ_REQTAPDOWN != 0 {
            event = DriftEvent::TapDown;
        } else {
            return DriftEvent::NoError;
        }

        let tap_num = u32::from(self.tap_num);
        let new_tap = match event {
            DriftEvent::TapUp => (u32::from(self.tap_set) + 1) % tap_num,
            _ => (u32::from(self.tap_set) + tap_num - 1) % tap_num,
        };
        self.tap_set = new_tap as u8;

        // The HS400 tap space on 4-tap silicon is half the tuning resolution.
        let programmed = if use_4tap { new_tap / 2 } else { new_tap };
        self.bus.scc_write32(regs::SCC_TAPSET, programmed);

        event
    }

    // ---- HS400 mode ----

    /// Finish the switch into HS400 mode and, if flagged, run the manual
    /// DLL calibration.
    pub fn enter_hs400(&mut self) -> Result<(), Error> {
        let Some(tappos) = self.tappos else {
            return Err(Error::UnknownClockRate);
        };

        self.sd_clock_stop()?;

        let mode = self.bus.ctl_read16(regs::CTL_SDIF_MODE);
        self.bus
            .ctl_write16(regs::CTL_SDIF_MODE, mode | regs::SDIF_MODE_HS400);

        self.bus.scc_write32(regs::SCC_DT2FF, tappos.hs400);

        // Gen3 SDMMC can't do automatic tap correction with HS400.
        if self.version == regs::VER_GEN3_SDMMC {
            self.scc_clear_bits(regs::SCC_RVSCNTL, regs::SCC_RVSCNTL_RVSEN);
        }

        self.scc_set_bits(
            regs::SCC_TMPPORT2,
            regs::SCC_TMPPORT2_HS400EN | regs::SCC_TMPPORT2_HS400OSEL,
        );

        // Narrow the sampling clock selection range for HS400.
        self.bus.scc_write32(
            regs::SCC_DTCNTL,
            regs::SCC_DTCNTL_TAPEN | (TAPNUM_HS400 << regs::SCC_DTCNTL_TAPNUM_SHIFT),
        );

        if self.use_4tap() {
            self.bus
                .scc_write32(regs::SCC_TAPSET, u32::from(self.tap_set) / 2);
        }

        self.scc_set_bits(regs::SCC_CKSEL, regs::SCC_CKSEL_DTSEL);
        self.sd_clock_start()?;

        if self.needs_adjust_hs400 {
            self.enable_manual_calibration();
        }
        Ok(())
    }

    /// Leave HS400 mode, undoing everything [`Scc::enter_hs400`] set up.
    pub fn exit_hs400(&mut self) -> Result<(), Error> {
        self.sd_clock_stop()?;

        let mode = self.bus.ctl_read16(regs::CTL_SDIF_MODE);
        self.bus
            .ctl_write16(regs::CTL_SDIF_MODE, mode & !regs::SDIF_MODE_HS400);

        self.bus
            .scc_write32(regs::SCC_DT2FF, self.tappos.unwrap_or_default().sdr);

        self.scc_clear_bits(
            regs::SCC_TMPPORT2,
            regs::SCC_TMPPORT2_HS400EN | regs::SCC_TMPPORT2_HS400OSEL,
        );

        self.disable_manual_calibration();

        self.sd_clock_start()
    }

    /// Drop back out of HS400 before its tuning cycle; the calibration is
    /// re-applied when [`Scc::enter_hs400`] completes.
    pub fn prepare_hs400_tuning(&mut self) -> Result<(), Error> {
        self.exit_hs400()?;
        self.needs_adjust_hs400 = true;
        Ok(())
    }

    /// Take the SCC out of the sampling path, for falling back to a
    /// non-tuned bus speed.
    pub fn disable_tuning(&mut self) -> Result<(), Error> {
        self.reset_scc()?;
        self.scc_clear_bits(regs::SCC_DTCNTL, regs::SCC_DTCNTL_TAPEN);
        self.sd_clock_start()
    }

    /// Reset tap and calibration state to the pre-tuning baseline.
    pub fn hardware_reset(&mut self) -> Result<(), Error> {
        self.reset_scc()?;
        self.exit_hs400()?;

        self.sd_clock_start()?;

        self.scc_clear_bits(regs::SCC_RVSCNTL, regs::SCC_RVSCNTL_RVSEN);
        self.scc_clear_bits(regs::SCC_RVSCNTL, regs::SCC_RVSCNTL_RVSEN);

        self.doing_tune = false;
        Ok(())
    }

    fn reset_scc(&mut self) -> Result<(), Error> {
        self.sd_clock_stop()?;
        self.scc_clear_bits(regs::SCC_CKSEL, regs::SCC_CKSEL_DTSEL);
        Ok(())
    }

    // ---- HS400 manual DLL calibration ----

    fn dll_read(&mut self, addr: u32) -> u32 {
        self.bus.scc_write32(
            regs::SCC_TMPPORT5,
            regs::SCC_TMPPORT5_DLL_RW_SEL_R | (regs::SCC_TMPPORT5_DLL_ADR_MASK & addr),
        );

        // Access start and stop.
        self.bus
            .scc_write32(regs::SCC_TMPPORT4, regs::SCC_TMPPORT4_DLL_ACC_START);
        self.bus.scc_write32(regs::SCC_TMPPORT4, 0);

        self.bus.scc_read32(regs::SCC_TMPPORT7)
    }

    fn dll_write(&mut self, addr: u32, val: u32) {
        self.bus.scc_write32(
            regs::SCC_TMPPORT5,
            regs::SCC_TMPPORT5_DLL_RW_SEL_W | (regs::SCC_TMPPORT5_DLL_ADR_MASK & addr),
        );
        self.bus.scc_write32(regs::SCC_TMPPORT6, val);

        // Access start and stop.
        self.bus
            .scc_write32(regs::SCC_TMPPORT4, regs::SCC_TMPPORT4_DLL_ACC_START);
        self.bus.scc_write32(regs::SCC_TMPPORT4, 0);
    }

    /// Switch the DLL to manual calibration with the code looked up from the
    /// per-revision table. No-op on silicon without a table.
    ///
    /// 1. Disable write protect.
    /// 2. Read the raw calibration code.
    /// 3. Look up the manual code in the table.
    /// 4. Enable manual calibration with that code.
    /// 5. Program the tap-position offset.
    pub fn enable_manual_calibration(&mut self) {
        let Some(table) = self.calib_table else {
            return;
        };

        self.dll_write(regs::DLL_ADDR_WRITE_PROTECT, regs::SCC_TMPPORT_DISABLE_WP_CODE);

        let raw = self.dll_read(regs::DLL_ADDR_CALIB_STATUS) & regs::SCC_TMPPORT_CALIB_CODE_MASK;
        let code = table[raw as usize];

        self.dll_write(
            regs::DLL_ADDR_MANUAL_CALIB,
            regs::SCC_TMPPORT_MANUAL_MODE | code,
        );
        self.bus.scc_write32(regs::SCC_TMPPORT3, self.calib_offset);

        self.needs_adjust_hs400 = false;
        debug!("manual calibration code {} (raw {})", code, raw);
    }

    /// Switch the DLL back to automatic calibration. No-op on silicon
    /// without a table.
    pub fn disable_manual_calibration(&mut self) {
        if self.calib_table.is_none() {
            return;
        }

        self.dll_write(regs::DLL_ADDR_WRITE_PROTECT, regs::SCC_TMPPORT_DISABLE_WP_CODE);
        self.dll_write(regs::DLL_ADDR_MANUAL_CALIB, 0);
        self.bus.scc_write32(regs::SCC_TMPPORT3, 0);

        self.needs_adjust_hs400 = false;
    }
}

/// Multiple-block reads of one or two blocks can return a corrupted response
/// depending on when the response register is read; clamp such reads to a
/// single block.
pub fn read_block_limit(block_count: u32) -> u32 {
    if block_count == 2 {
        1
    } else {
        block_count
    }
}
