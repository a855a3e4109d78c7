//! Per-SoC-revision behavioral quirks and HS400 manual-calibration tables.
//!
//! Quirks are plain data, resolved once from the SoC identity at attach time
//! and never changed afterwards.

use crate::regs;

/// Entries in one HS400 calibration table variant, indexed by the 5-bit DLL
/// calibration readout.
pub const CALIB_TABLE_MAX: usize = (regs::SCC_TMPPORT_CALIB_CODE_MASK + 1) as usize;

/// Behavioral deviations of one silicon revision.
#[derive(Debug, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SdhiQuirks {
    /// HS400 runs with half the tuning tap resolution (4 taps).
    pub hs400_4taps: bool,
    /// HS400 does not work at all; the capability is dropped at attach.
    pub hs400_disabled: bool,
    /// DMA end flag lives in bit 17 instead of bit 16.
    pub dtranend1_bit17: bool,
    /// HS400 requires manual DLL calibration from `hs400_calib_table`.
    pub hs400_manual_calib: bool,
    /// 2-bit tap-position offset written to TMPPORT3 during calibration.
    pub hs400_offset: u32,
    /// Calibration table, one variant per port.
    pub hs400_calib_table: Option<&'static [[u32; CALIB_TABLE_MAX]; 2]>,
}

const QUIRKS_NONE: SdhiQuirks = SdhiQuirks {
    hs400_4taps: false,
    hs400_disabled: false,
    dtranend1_bit17: false,
    hs400_manual_calib: false,
    hs400_offset: 0,
    hs400_calib_table: None,
};

static R8A7796_REV1_CALIB_TABLE: [[u32; CALIB_TABLE_MAX]; 2] = [
    [
        3, 3, 3, 3, 3, 3, 3, 4, 4, 5, 6, 7, 8, 9, 10, 15, //
        16, 16, 16, 16, 16, 16, 17, 18, 18, 19, 20, 21, 22, 23, 24, 25,
    ],
    [
        5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 6, 7, 8, 11, //
        12, 17, 18, 18, 18, 18, 18, 18, 18, 19, 20, 21, 22, 23, 25, 25,
    ],
];

static R8A77965_CALIB_TABLE: [[u32; CALIB_TABLE_MAX]; 2] = [
    [
        1, 2, 6, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 15, 15, 16, //
        17, 18, 19, 20, 21, 22, 23, 24, 25, 25, 26, 27, 28, 29, 30, 31,
    ],
    [
        2, 3, 4, 4, 5, 6, 7, 9, 10, 11, 12, 13, 14, 15, 16, 17, //
        17, 17, 20, 21, 22, 23, 24, 25, 27, 28, 29, 30, 31, 31, 31, 31,
    ],
];

static R8A77990_CALIB_TABLE: [[u32; CALIB_TABLE_MAX]; 2] = [
    [
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ],
    [
        0, 0, 0, 1, 2, 3, 3, 4, 4, 4, 5, 5, 6, 8, 9, 10, //
        11, 12, 13, 15, 16, 17, 17, 18, 18, 19, 20, 22, 24, 25, 26, 26,
    ],
];

static QUIRKS_4TAP: SdhiQuirks = SdhiQuirks {
    hs400_4taps: true,
    ..QUIRKS_NONE
};

static QUIRKS_4TAP_NOHS400_BIT17: SdhiQuirks = SdhiQuirks {
    hs400_disabled: true,
    hs400_4taps: true,
    dtranend1_bit17: true,
    ..QUIRKS_NONE
};

static QUIRKS_4TAP_NOHS400: SdhiQuirks = SdhiQuirks {
    hs400_disabled: true,
    hs400_4taps: true,
    ..QUIRKS_NONE
};

static QUIRKS_R8A7796_REV1: SdhiQuirks = SdhiQuirks {
    hs400_4taps: true,
    hs400_manual_calib: true,
    hs400_offset: regs::SCC_TMPPORT3_OFFSET_0,
    hs400_calib_table: Some(&R8A7796_REV1_CALIB_TABLE),
    ..QUIRKS_NONE
};

static QUIRKS_R8A77965: SdhiQuirks = SdhiQuirks {
    hs400_manual_calib: true,
    hs400_offset: regs::SCC_TMPPORT3_OFFSET_0,
    hs400_calib_table: Some(&R8A77965_CALIB_TABLE),
    ..QUIRKS_NONE
};

static QUIRKS_R8A77990: SdhiQuirks = SdhiQuirks {
    hs400_manual_calib: true,
    hs400_offset: regs::SCC_TMPPORT3_OFFSET_0,
    hs400_calib_table: Some(&R8A77990_CALIB_TABLE),
    ..QUIRKS_NONE
};

struct SocMatch {
    soc_id: &'static str,
    /// Revision pattern; a trailing `*` matches any suffix. `None` matches
    /// every revision.
    revision: Option<&'static str>,
    quirks: &'static SdhiQuirks,
}

/// First match wins, so more specific revisions come first.
static SOC_QUIRKS: &[SocMatch] = &[
    SocMatch {
        soc_id: "r8a774a1",
        revision: Some("ES1.*"),
        quirks: &QUIRKS_R8A7796_REV1,
    },
    SocMatch {
        soc_id: "r8a774b1",
        revision: None,
        quirks: &QUIRKS_R8A77965,
    },
    SocMatch {
        soc_id: "r8a774c0",
        revision: None,
        quirks: &QUIRKS_R8A77990,
    },
    SocMatch {
        soc_id: "r8a7795",
        revision: Some("ES1.*"),
        quirks: &QUIRKS_4TAP_NOHS400_BIT17,
    },
    SocMatch {
        soc_id: "r8a7795",
        revision: Some("ES2.0"),
        quirks: &QUIRKS_4TAP,
    },
    SocMatch {
        soc_id: "r8a7796",
        revision: Some("ES1.0"),
        quirks: &QUIRKS_4TAP_NOHS400_BIT17,
    },
    SocMatch {
        soc_id: "r8a7796",
        revision: Some("ES1.1"),
        quirks: &QUIRKS_4TAP_NOHS400,
    },
    SocMatch {
        soc_id: "r8a7796",
        revision: Some("ES1.*"),
        quirks: &QUIRKS_R8A7796_REV1,
    },
    SocMatch {
        soc_id: "r8a77965",
        revision: None,
        quirks: &QUIRKS_R8A77965,
    },
    SocMatch {
        soc_id: "r8a77990",
        revision: None,
        quirks: &QUIRKS_R8A77990,
    },
];

fn revision_matches(pattern: &str, revision: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => revision.starts_with(prefix),
        None => pattern == revision,
    }
}

/// Look up the quirks for a SoC identity, `None` for well-behaved parts.
pub fn for_soc(soc_id: &str, revision: &str) -> Option<&'static SdhiQuirks> {
    SOC_QUIRKS
        .iter()
        .find(|m| {
            m.soc_id == soc_id
                && m.revision
                    .map_or(true, |pattern| revision_matches(pattern, revision))
        })
        .map(|m| m.quirks)
}
