//! Gameplay modifier bitset.
//!
//! Mod names must match the way Bancho spells them in chat so that
//! free-text notifications can be matched back to flags. Bancho still uses
//! the legacy name "Relax2" for Autopilot; that rename is handled here.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

use tracing::warn;

/// A set of gameplay modifiers.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Mods(u32);

impl Mods {
    /// The empty set.
    pub const NONE: Mods = Mods(0);
    /// Players pick their own mods.
    pub const FREEMOD: Mods = Mods(1 << 0);
    /// EZ
    pub const EASY: Mods = Mods(1 << 1);
    /// NF
    pub const NO_FAIL: Mods = Mods(1 << 2);
    /// HT
    pub const HALF_TIME: Mods = Mods(1 << 3);
    /// HR
    pub const HARD_ROCK: Mods = Mods(1 << 4);
    /// SD
    pub const SUDDEN_DEATH: Mods = Mods(1 << 5);
    /// PF
    pub const PERFECT: Mods = Mods(1 << 6);
    /// DT
    pub const DOUBLE_TIME: Mods = Mods(1 << 7);
    /// NC
    pub const NIGHTCORE: Mods = Mods(1 << 8);
    /// HD
    pub const HIDDEN: Mods = Mods(1 << 9);
    /// FI (mania)
    pub const FADE_IN: Mods = Mods(1 << 10);
    /// FL
    pub const FLASHLIGHT: Mods = Mods(1 << 11);
    /// RX
    pub const RELAX: Mods = Mods(1 << 12);
    /// AP
    pub const AUTOPILOT: Mods = Mods(1 << 13);
    /// SO
    pub const SPUN_OUT: Mods = Mods(1 << 14);

    /// Every named flag with its chat spelling, in the order the short
    /// form is assembled.
    pub const NAMED: &'static [(Mods, &'static str, &'static str)] = &[
        (Mods::FREEMOD, "Freemod", "FM"),
        (Mods::RELAX, "Relax", "RX"),
        (Mods::AUTOPILOT, "Autopilot", "AP"),
        (Mods::SPUN_OUT, "SpunOut", "SO"),
        (Mods::EASY, "Easy", "EZ"),
        (Mods::NO_FAIL, "NoFail", "NF"),
        (Mods::HIDDEN, "Hidden", "HD"),
        (Mods::FADE_IN, "FadeIn", "FI"),
        (Mods::HALF_TIME, "HalfTime", "HT"),
        (Mods::DOUBLE_TIME, "DoubleTime", "DT"),
        (Mods::NIGHTCORE, "Nightcore", "NC"),
        (Mods::HARD_ROCK, "HardRock", "HR"),
        (Mods::SUDDEN_DEATH, "SuddenDeath", "SD"),
        (Mods::PERFECT, "Perfect", "PF"),
        (Mods::FLASHLIGHT, "Flashlight", "FL"),
    ];

    /// Whether every flag in `other` is present.
    pub fn contains(self, other: Mods) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any flag in `other` is present.
    pub fn intersects(self, other: Mods) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether the set is empty.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Remove the flags in `other`.
    pub fn remove(&mut self, other: Mods) {
        self.0 &= !other.0;
    }

    /// Resolve a single mod from its chat spelling. Accepts the legacy
    /// "Relax2" synonym Bancho uses for Autopilot.
    pub fn from_name(name: &str) -> Option<Mods> {
        let name = name.trim();
        if name == "None" {
            return Some(Mods::NONE);
        }
        if name == "Relax2" {
            return Some(Mods::AUTOPILOT);
        }
        Mods::NAMED
            .iter()
            .find(|(_, long, _)| *long == name)
            .map(|(m, _, _)| *m)
    }

    /// Parse a comma-separated mod list as Bancho prints it. Unknown
    /// tokens are logged and skipped, never fatal.
    ///
    /// Bancho reports both DoubleTime and Nightcore when Nightcore is the
    /// one mod actually active, so DoubleTime is suppressed whenever
    /// Nightcore is present.
    pub fn parse_list(list: &str) -> Mods {
        let mut mods = Mods::NONE;
        for token in list.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match Mods::from_name(token) {
                Some(m) => mods |= m,
                None => warn!(mod_name = token, "unknown mod name in mod list"),
            }
        }
        mods.suppress_nightcore_double_time()
    }

    /// Apply the Nightcore-over-DoubleTime suppression rule.
    pub fn suppress_nightcore_double_time(mut self) -> Mods {
        if self.contains(Mods::NIGHTCORE) {
            self.remove(Mods::DOUBLE_TIME);
        }
        self
    }

    /// Short form, e.g. `HDDT`. `None` when the set is empty.
    pub fn to_short_string(self) -> String {
        let mut out = String::new();
        for (m, _, short) in Mods::NAMED {
            if self.contains(*m) {
                out.push_str(short);
            }
        }
        if out.is_empty() {
            out.push_str("None");
        }
        out
    }
}

impl BitOr for Mods {
    type Output = Mods;
    fn bitor(self, rhs: Mods) -> Mods {
        Mods(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mods {
    fn bitor_assign(&mut self, rhs: Mods) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Mods {
    type Output = Mods;
    fn bitand(self, rhs: Mods) -> Mods {
        Mods(self.0 & rhs.0)
    }
}

impl BitAndAssign for Mods {
    fn bitand_assign(&mut self, rhs: Mods) {
        self.0 &= rhs.0;
    }
}

/// Long form as Bancho prints it, e.g. `Hidden, DoubleTime`.
impl fmt::Display for Mods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (m, long, _) in Mods::NAMED {
            if self.contains(*m) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(long)?;
                first = false;
            }
        }
        if first {
            f.write_str("None")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Mods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mods({self})")
    }
}
