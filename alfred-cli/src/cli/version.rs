//! # Version Command

use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct VersionArgs {}

pub fn run(_args: VersionArgs) -> Result<()> {
  println!("Alfred CLI {}", env!("CARGO_PKG_VERSION"));
  Ok(())
}
