//! Register map of the SDHI control block and the SCC (Sampling Clock
//! Controller) block.
//!
//! Offsets are byte offsets for the original 2-byte register spacing; the bus
//! implementation scales them by `1 << bus_shift` for controllers whose
//! registers are 4 or 8 bytes apart.

// Control block.
pub const CTL_SD_CMD: u32 = 0x00;
pub const CTL_STOP_INTERNAL_ACTION: u32 = 0x08;
pub const CTL_XFER_BLK_COUNT: u32 = 0x0a;
/// 32-bit status, read/written as two 16-bit halves.
pub const CTL_STATUS: u32 = 0x1c;
pub const CTL_SD_CARD_CLK_CTL: u32 = 0x24;
pub const CTL_SD_XFER_LEN: u32 = 0x26;
pub const CTL_SD_MEM_CARD_OPT: u32 = 0x28;
pub const CTL_TRANSACTION_CTL: u32 = 0x34;
pub const CTL_DMA_ENABLE: u32 = 0xd8;
pub const CTL_VERSION: u32 = 0xe2;
pub const CTL_HOST_MODE: u32 = 0xe4;
pub const CTL_SDIF_MODE: u32 = 0xe6;

/// `CTL_SD_CARD_CLK_CTL`: sampling clock enable.
pub const CLK_CTL_SCLKEN: u16 = 1 << 8;
/// `CTL_SDIF_MODE`: HS400 interface mode.
pub const SDIF_MODE_HS400: u16 = 1 << 0;

// `CTL_STATUS` bits.
pub const STAT_DAT0: u32 = 1 << 23;
/// Command sequence busy (CBSY). Not present on all revisions.
pub const STAT_CMD_BUSY: u32 = 1 << 30;
/// Clock divider ready; cleared while the bus is busy.
pub const STAT_SCLKDIVEN: u32 = 1 << 31;

// `CTL_VERSION` codes.
pub const VER_GEN2_SDR50: u16 = 0x490c;
pub const VER_RZ_A1: u16 = 0x820b;
/// Very old datasheets said 0x490c for SDR104, too. They are wrong!
pub const VER_GEN2_SDR104: u16 = 0xcb0d;
pub const VER_GEN3_SD: u16 = 0xcc10;
pub const VER_GEN3_SDMMC: u16 = 0xcd10;

// SCC block.
pub const SCC_DTCNTL: u32 = 0x000;
pub const SCC_TAPSET: u32 = 0x002;
pub const SCC_DT2FF: u32 = 0x004;
pub const SCC_CKSEL: u32 = 0x006;
pub const SCC_RVSCNTL: u32 = 0x008;
pub const SCC_RVSREQ: u32 = 0x00a;
pub const SCC_SMPCMP: u32 = 0x00c;
pub const SCC_TMPPORT2: u32 = 0x00e;
pub const SCC_TMPPORT3: u32 = 0x014;
pub const SCC_TMPPORT4: u32 = 0x016;
pub const SCC_TMPPORT5: u32 = 0x018;
pub const SCC_TMPPORT6: u32 = 0x01a;
pub const SCC_TMPPORT7: u32 = 0x01c;

/// `SCC_DTCNTL`: tap function enable.
pub const SCC_DTCNTL_TAPEN: u32 = 1 << 0;
pub const SCC_DTCNTL_TAPNUM_SHIFT: u32 = 16;
pub const SCC_DTCNTL_TAPNUM_MASK: u32 = 0xff;

/// `SCC_CKSEL`: sampling clock select.
pub const SCC_CKSEL_DTSEL: u32 = 1 << 0;

/// `SCC_RVSCNTL`: hardware auto-correction enable.
pub const SCC_RVSCNTL_RVSEN: u32 = 1 << 0;

// `SCC_RVSREQ` bits.
pub const SCC_RVSREQ_RVSERR: u32 = 1 << 2;
pub const SCC_RVSREQ_REQTAPUP: u32 = 1 << 1;
pub const SCC_RVSREQ_REQTAPDOWN: u32 = 1 << 0;

// `SCC_SMPCMP` command-line comparison bits.
pub const SCC_SMPCMP_CMD_REQUP: u32 = 1 << 24;
pub const SCC_SMPCMP_CMD_REQDOWN: u32 = 1 << 8;
pub const SCC_SMPCMP_CMD_ERR: u32 = SCC_SMPCMP_CMD_REQUP | SCC_SMPCMP_CMD_REQDOWN;

// `SCC_TMPPORT2` bits.
pub const SCC_TMPPORT2_HS400OSEL: u32 = 1 << 4;
pub const SCC_TMPPORT2_HS400EN: u32 = 1 << 31;

// `SCC_TMPPORT3` tap-position offset values.
pub const SCC_TMPPORT3_OFFSET_0: u32 = 3;
pub const SCC_TMPPORT3_OFFSET_1: u32 = 2;
pub const SCC_TMPPORT3_OFFSET_2: u32 = 1;
pub const SCC_TMPPORT3_OFFSET_3: u32 = 0;
pub const SCC_TMPPORT3_OFFSET_MASK: u32 = 0x3;

/// `SCC_TMPPORT4`: DLL access start.
pub const SCC_TMPPORT4_DLL_ACC_START: u32 = 1 << 0;

// `SCC_TMPPORT5` DLL access control.
pub const SCC_TMPPORT5_DLL_RW_SEL_R: u32 = 1 << 8;
pub const SCC_TMPPORT5_DLL_RW_SEL_W: u32 = 0 << 8;
pub const SCC_TMPPORT5_DLL_ADR_MASK: u32 = 0x3f;

// DLL internal register access (through TMPPORT4..7).
pub const SCC_TMPPORT_DISABLE_WP_CODE: u32 = 0xa500_0000;
pub const SCC_TMPPORT_CALIB_CODE_MASK: u32 = 0x1f;
pub const SCC_TMPPORT_MANUAL_MODE: u32 = 1 << 7;

/// DLL address: write-protect control.
pub const DLL_ADDR_WRITE_PROTECT: u32 = 0x00;
/// DLL address: manual calibration mode and code.
pub const DLL_ADDR_MANUAL_CALIB: u32 = 0x22;
/// DLL address: calibration readout.
pub const DLL_ADDR_CALIB_STATUS: u32 = 0x26;
