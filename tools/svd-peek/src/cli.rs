use std::path::PathBuf;

use clap::Parser;

fn hex(text: &str) -> Result<u64, String> {
    regmap::scalar::parse_hex(text).ok_or_else(|| format!("invalid hex value: {text}"))
}

/// Decode peripheral register values with an SVD description
#[derive(Parser, Debug)]
pub struct Args {
    /// SVD file, or a chip name looked up in `--svd-dir`
    #[arg(short = 's', long)]
    pub svd: String,

    /// Register address to decode, e.g. 0x40021000
    #[arg(short = 'a', long, value_parser = hex, required_unless_present = "list")]
    pub addr: Option<u64>,

    /// Raw register value, always hexadecimal: `83` and `0x83` both mean 0x83
    #[arg(
        short = 'v',
        long,
        value_parser = hex,
        conflicts_with = "dump",
        required_unless_present_any = ["dump", "list"]
    )]
    pub val: Option<u64>,

    /// Binary memory image to read the register value from (little-endian words)
    #[arg(long, requires = "dump_base")]
    pub dump: Option<PathBuf>,

    /// Address of the first byte of `--dump`
    #[arg(long, value_parser = hex)]
    pub dump_base: Option<u64>,

    /// Directories searched when `--svd` is a chip name
    #[arg(long = "svd-dir", env = "SVD_PEEK_SVD_DIR", value_delimiter = ',')]
    pub svd_dirs: Vec<PathBuf>,

    /// Directory holding parsed SVD snapshots
    #[arg(long, env = "SVD_PEEK_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Neither read nor write the snapshot cache
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Print every register of the memory map instead of decoding one
    #[arg(short = 'l', long, default_value_t = false)]
    pub list: bool,
}

impl Args {
    pub fn loader_config(&self) -> regmap::LoaderConfig {
        regmap::LoaderConfig {
            search_dirs: self.svd_dirs.clone(),
            cache_dir: self.cache_dir.clone(),
            use_cache: !self.no_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_with_literal_value() {
        let args = Args::try_parse_from([
            "svd-peek",
            "--svd",
            "STM32F401.svd",
            "--addr",
            "0x40023800",
            "--val",
            "83",
        ])
        .unwrap();
        assert_eq!(args.addr, Some(0x4002_3800));
        assert_eq!(args.val, Some(0x83));
        assert!(args.loader_config().use_cache);

        let help = <Args as clap::CommandFactory>::command().render_help().to_string();
        assert!(help.contains("always hexadecimal"), "{help}");
    }

    #[test]
    fn value_or_dump_is_required() {
        assert!(Args::try_parse_from(["svd-peek", "-s", "x.svd", "-a", "0x0"]).is_err());
        assert!(Args::try_parse_from([
            "svd-peek", "-s", "x.svd", "-a", "0x0", "--dump", "mem.bin", "--dump-base", "0x20000000",
        ])
        .is_ok());
        assert!(Args::try_parse_from(["svd-peek", "-s", "x.svd", "-a", "0x0", "--dump", "mem.bin"]).is_err());
        assert!(Args::try_parse_from(["svd-peek", "-s", "x.svd", "-a", "0x0", "-v", "1", "--dump", "m", "--dump-base", "0"]).is_err());
    }

    #[test]
    fn list_needs_no_address() {
        let args = Args::try_parse_from(["svd-peek", "-s", "x.svd", "--list", "--no-cache"]).unwrap();
        assert!(args.list);
        assert!(!args.loader_config().use_cache);
    }

    #[test]
    fn rejects_non_hex() {
        assert!(Args::try_parse_from(["svd-peek", "-s", "x.svd", "-a", "0xZZ", "-v", "0"]).is_err());
    }
}
