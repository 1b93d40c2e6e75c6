//! Code point-wise copy of the inputs to stdout.
//!
//! Exercises the codec round trip: decode on the way in, re-encode on
//! the way out. In UTF-16 mode astral characters travel between the
//! two streams as surrogate halves and fuse back on output.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use chario::{CodecMode, SharedStream, Stdio};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Whole Unicode scalar values.
    Utf32,
    /// Surrogate-pair emulation for values above U+FFFF.
    Utf16,
}

impl From<Mode> for CodecMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Utf32 => CodecMode::Utf32,
            Mode::Utf16 => CodecMode::Utf16,
        }
    }
}

/// Copies files (or stdin) to stdout one code point at a time.
#[derive(Debug, Parser)]
#[command(name = "cat-char")]
#[command(about = "Copy inputs to stdout code point by code point")]
struct Args {
    /// Input files; stdin when omitted.
    files: Vec<PathBuf>,
    /// How code points above U+FFFF are passed through.
    #[arg(long, value_enum, default_value_t = Mode::Utf32)]
    mode: Mode,
    /// Fail on malformed UTF-8 instead of substituting U+FFFD.
    #[arg(long)]
    strict: bool,
}

async fn cat(input: &SharedStream, output: &SharedStream, args: &Args) -> chario::Result<()> {
    let mut src = input.lock().await;
    src.set_codec_mode(args.mode.into());
    src.set_strict_utf8(args.strict);
    let mut dst = output.lock().await;
    while let Some(cp) = src.get_codepoint().await? {
        dst.put_codepoint(cp).await?;
    }
    Ok(())
}

async fn run(stdio: &Stdio, args: &Args) -> chario::Result<()> {
    if args.files.is_empty() {
        return cat(stdio.stdin(), stdio.stdout(), args).await;
    }
    for path in &args.files {
        let input = stdio.open(path).await?;
        cat(&input, stdio.stdout(), args).await?;
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
