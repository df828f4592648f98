use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubeglance",
    version,
    about = "Sortable Kubernetes resource tables with a master-detail drawer."
)]
pub struct CliArgs {
    /// Refresh interval in milliseconds
    #[arg(long, default_value_t = 1_500)]
    pub refresh_ms: u64,

    /// Start in a specific namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Start with all namespaces selected
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Initial list (pods, deploy, rs, ns, pc)
    #[arg(long, default_value = "pods")]
    pub kind: String,

    /// Start with the detail drawer disabled
    #[arg(long)]
    pub no_drawer: bool,

    /// Minimum terminal width (columns) at which the drawer may be shown
    #[arg(long)]
    pub wide_columns: Option<u16>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn defaults_leave_drawer_enabled() {
        let args = CliArgs::parse_from(["kubeglance"]);
        assert!(!args.no_drawer);
        assert_eq!(args.kind, "pods");
        assert_eq!(args.wide_columns, None);
        assert_eq!(args.refresh_ms, 1_500);
    }

    #[test]
    fn parses_namespace_and_drawer_flags() {
        let args = CliArgs::parse_from([
            "kubeglance",
            "-n",
            "kube-system",
            "--kind",
            "deploy",
            "--no-drawer",
            "--wide-columns",
            "120",
        ]);
        assert_eq!(args.namespace.as_deref(), Some("kube-system"));
        assert_eq!(args.kind, "deploy");
        assert!(args.no_drawer);
        assert_eq!(args.wide_columns, Some(120));
    }
}
