use std::fmt;
use std::str::FromStr;

/// Optional behaviour, selected with `--features`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// `LDR` reads memory once at `BaseR + offset6`, instead of reading the word found there
    /// as a second address.
    pub canonical_ldr: bool,
    /// Unknown trap vectors stop the machine instead of being skipped.
    pub strict_traps: bool,
}

impl FromStr for Features {
    type Err = String;
    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let mut features = Self::default();
        for word in string.split(',').map(str::trim) {
            let value = match word {
                "" => continue,
                "canonical-ldr" => &mut features.canonical_ldr,
                "strict-traps" => &mut features.strict_traps,
                _ => return Err(format!("Unknown feature '{}'", word)),
            };
            if *value {
                return Err(format!("Cannot specify feature '{}' twice", word));
            }
            *value = true;
        }
        Ok(features)
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let features = [
            ("canonical-ldr", self.canonical_ldr),
            ("strict-traps", self.strict_traps),
        ];
        let mut has_any_feature = false;
        for (name, value) in features {
            if !value {
                continue;
            }
            if has_any_feature {
                write!(f, ",")?;
            }
            write!(f, "{}", name)?;
            has_any_feature = true;
        }
        Ok(())
    }
}
