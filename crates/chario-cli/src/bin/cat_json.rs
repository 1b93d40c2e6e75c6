//! Token-wise JSON reformatter.
//!
//! Pulls tokens off the input and re-emits them with tab indentation
//! that follows bracket depth: a newline after `[`, `{`, and `,`, and
//! a newline before `]` and `}`. Lexemes pass through verbatim, so the
//! output parses to the same document as the input.

use std::path::PathBuf;

use clap::Parser;

use chario::{SharedStream, Stdio};

/// Pretty-prints JSON from files (or stdin) to stdout.
#[derive(Debug, Parser)]
#[command(name = "cat-json")]
#[command(about = "Re-indent JSON inputs token by token")]
struct Args {
    /// Input files; stdin when omitted.
    files: Vec<PathBuf>,
}

async fn cat(input: &SharedStream, output: &SharedStream) -> chario::Result<()> {
    let mut src = input.lock().await;
    let mut dst = output.lock().await;
    let mut depth: usize = 0;
    while let Some(token) = src.get_token().await? {
        let mut text = String::new();
        if token == "{" || token == "[" {
            depth += 1;
        }
        if token == "}" || token == "]" {
            depth = depth.saturating_sub(1);
            text.push('\n');
            for _ in 0..depth {
                text.push('\t');
            }
        }
        text.push_str(&token);
        if token == "[" || token == "{" || token == "," {
            text.push('\n');
            for _ in 0..depth {
                text.push('\t');
            }
        }
        dst.put_str(&text).await?;
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
