use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::BIN_NAME;

#[derive(Args, Debug)]
pub struct ManArgs {
    /// Output directory (default: dist/share/man/man1)
    #[arg(long = "out-dir", default_value = "dist/share/man/man1")]
    pub out_dir: PathBuf,
}

pub fn cmd_man(args: ManArgs) -> Result<(), String> {
    let out_dir = crate::workspace_root().join(args.out_dir);
    fs::create_dir_all(&out_dir).map_err(|e| format!("{}: {e}", out_dir.display()))?;

    for (file_name, page) in pages(rela::command()) {
        let buffer = render(page)?;
        let path = out_dir.join(&file_name);
        fs::write(&path, buffer).map_err(|e| format!("{}: {e}", path.display()))?;
        println!("wrote {}", path.display());
    }

    Ok(())
}

/// One page for the root command plus `rela-<sub>.1` for each visible
/// subcommand. Subcommand pages get a display and bin name so their NAME
/// and SYNOPSIS read `rela-analyze` rather than a bare `analyze`.
fn pages(cmd: clap::Command) -> Vec<(String, clap::Command)> {
    let mut pages = vec![(format!("{BIN_NAME}.1"), cmd.clone())];
    for sub in cmd.get_subcommands() {
        let name = sub.get_name();
        if name == "help" || sub.is_hide_set() {
            continue;
        }
        let full = format!("{BIN_NAME}-{name}");
        let page = sub.clone().display_name(full.clone()).bin_name(full.clone());
        pages.push((format!("{full}.1"), page));
    }
    pages
}

fn render(page: clap::Command) -> Result<Vec<u8>, String> {
    let name = page
        .get_display_name()
        .unwrap_or_else(|| page.get_name())
        .to_string();
    let mut buffer: Vec<u8> = Vec::new();
    clap_mangen::Man::new(page)
        .render(&mut buffer)
        .map_err(|e| format!("render manpage for {name}: {e}"))?;
    Ok(buffer)
}
