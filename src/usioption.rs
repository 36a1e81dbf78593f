use crate::tt::*;

pub struct UsiOptions {
    pub usi_hash: i64,
    pub threads: i64,
    pub cutechess_workaround: bool,
}

impl UsiOptions {
    pub const USI_HASH: &'static str = "USI_Hash";
    pub const THREADS: &'static str = "Threads";
    pub const CUTECHESS_WORKAROUND: &'static str = "CuteChessWorkaround";

    pub const MAX_THREADS: i64 = 512;

    pub fn new() -> UsiOptions {
        UsiOptions {
            usi_hash: DEFAULT_TT_MIB as i64,
            threads: 1,
            cutechess_workaround: false,
        }
    }

    pub fn to_usi_string(&self) -> String {
        let mut s = String::new();
        s += &format!(
            "option name {} type spin default {} min {} max {}\n",
            UsiOptions::USI_HASH,
            DEFAULT_TT_MIB,
            MIN_TT_MIB,
            MAX_TT_MIB
        );
        s += &format!(
            "option name {} type spin default 1 min 1 max {}\n",
            UsiOptions::THREADS,
            UsiOptions::MAX_THREADS
        );
        s += &format!(
            "option name {} type check default false",
            UsiOptions::CUTECHESS_WORKAROUND
        );
        s
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            UsiOptions::USI_HASH => {
                let mib: i64 = value.parse().map_err(|_| format!("invalid hash size: {}", value))?;
                self.usi_hash = mib.clamp(MIN_TT_MIB as i64, MAX_TT_MIB as i64);
            }
            UsiOptions::THREADS => {
                let threads: i64 = value.parse().map_err(|_| format!("invalid thread count: {}", value))?;
                self.threads = threads.clamp(1, UsiOptions::MAX_THREADS);
            }
            UsiOptions::CUTECHESS_WORKAROUND => match value {
                "true" => self.cutechess_workaround = true,
                "false" => self.cutechess_workaround = false,
                _ => return Err(format!("invalid check value: {}", value)),
            },
            _ => return Err(format!("unknown option: {}", name)),
        }
        Ok(())
    }
}

#[test]
fn test_options_defaults() {
    let options = UsiOptions::new();
    assert_eq!(options.usi_hash, DEFAULT_TT_MIB as i64);
    assert_eq!(options.threads, 1);
    assert!(!options.cutechess_workaround);
    assert!(options.to_usi_string().contains("USI_Hash"));
}

#[test]
fn test_options_set() {
    let mut options = UsiOptions::new();
    options.set(UsiOptions::USI_HASH, "256").unwrap();
    assert_eq!(options.usi_hash, 256);
    options.set(UsiOptions::THREADS, "8").unwrap();
    assert_eq!(options.threads, 8);
    options.set(UsiOptions::CUTECHESS_WORKAROUND, "true").unwrap();
    assert!(options.cutechess_workaround);
    assert!(options.set("NoSuchOption", "1").is_err());
    assert!(options.set(UsiOptions::THREADS, "lots").is_err());
    // out-of-range values clamp rather than fail
    options.set(UsiOptions::THREADS, "100000").unwrap();
    assert_eq!(options.threads, UsiOptions::MAX_THREADS);
}
