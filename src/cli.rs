use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ethdash")]
#[command(version)]
#[command(about = "A TUI dashboard for an Ethereum wallet that tracks transfer confirmations")]
pub struct Args {
    /// Tick rate in ticks per second
    #[arg(short, long, default_value_t = 4.0)]
    pub tick_rate: f64,

    /// Frame rate in frames per second
    #[arg(short, long, default_value_t = 30.0)]
    pub frame_rate: f64,

    /// Network to connect to (devnet, sepolia, mainnet, sim)
    /// If not specified, uses the config file or defaults to devnet
    #[arg(short, long)]
    pub network: Option<String>,

    /// Custom RPC URL (overrides network default)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Data directory path
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Seconds between confirmation poll passes
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Confirmations required before a transaction is final
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub confirmations: Option<u64>,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["ethdash"]);
        assert_eq!(args.tick_rate, 4.0);
        assert!(args.network.is_none());
        assert!(args.confirmations.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "ethdash",
            "--network",
            "sim",
            "--poll-interval",
            "2",
            "--confirmations",
            "3",
        ]);
        assert_eq!(args.network.as_deref(), Some("sim"));
        assert_eq!(args.poll_interval, Some(2));
        assert_eq!(args.confirmations, Some(3));
    }

    #[test]
    fn test_zero_confirmations_rejected() {
        assert!(Args::try_parse_from(["ethdash", "--confirmations", "0"]).is_err());
    }
}
