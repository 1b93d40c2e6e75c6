//! Byte-for-byte copy of the inputs to stdout.

use std::path::PathBuf;

use clap::Parser;

use chario::{SharedStream, Stdio};

/// Copies files (or stdin) to stdout one byte at a time.
#[derive(Debug, Parser)]
#[command(name = "cat-byte")]
#[command(about = "Copy inputs to stdout byte by byte")]
struct Args {
    /// Input files; stdin when omitted.
    files: Vec<PathBuf>,
}

async fn cat(input: &SharedStream, output: &SharedStream) -> chario::Result<()> {
    let mut src = input.lock().await;
    let mut dst = output.lock().await;
    while let Some(byte) = src.get_byte().await? {
        dst.put_byte(byte).await?;
    }
    Ok(())
}

async fn run(stdio: &Stdio, args: &Args) -> chario::Result<()> {
    if args.files.is_empty() {
        return cat(stdio.stdin(), stdio.stdout()).await;
    }
    for path in &args.files {
        let input = stdio.open(path).await?;
        cat(&input, stdio.stdout()).await?;
        input.close().await?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    chario_cli::init_tracing();
    let args = Args::parse();
    let stdio = Stdio::new();
    let outcome = run(&stdio, &args).await;
    let shutdown = stdio.shutdown().await;
    outcome?;
    shutdown?;
    Ok(())
}
