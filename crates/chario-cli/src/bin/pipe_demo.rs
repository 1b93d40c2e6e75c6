//! Producer/consumer demo over an in-memory pipe.
//!
//! One task writes numbered lines into the pipe, pausing every tenth
//! line; the other drains the pipe in small chunks onto stdout. Both
//! run under a single-threaded runtime, so every byte that appears is
//! a suspension having done its job.

use std::time::Duration;

use clap::Parser;

use chario::{Channel, PipeReader, PipeWriter, SharedStream, Stdio, mem_pipe};

/// Streams numbered lines through an in-memory pipe to stdout.
#[derive(Debug, Parser)]
#[command(name = "pipe-demo")]
#[command(about = "Drive an in-memory pipe between two tasks")]
struct Args {
    /// How many numbered lines the producer writes.
    #[arg(long, default_value_t = 1000)]
    count: u32,
    /// Microseconds the producer pauses every tenth line.
    #[arg(long, default_value_t = 500_000)]
    pause_us: u64,
}

async fn write_loop(mut producer: PipeWriter, count: u32, pause: Duration) -> chario::Result<()> {
    for i in 0..count {
        let line = format!("{i}\n");
        let mut data = line.as_bytes();
        while !data.is_empty() {
            let n = producer.write(data).await?;
            data = &data[n..];
        }
        if i % 10 == 0 {
            tokio::time::sleep(pause).await;
        }
    }
    producer.close().await
}

async fn read_loop(mut consumer: PipeReader, output: &SharedStream) -> chario::Result<()> {
    let mut dst = output.lock().await;
    let mut buf = [0u8; 10];
    loop {
        let n = consumer.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        dst.write(&buf[..n]).await?;
        dst.flush().await?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    chario_cli::init_tracing();
    let args = Args::parse();
    let stdio = Stdio::new();
    let (consumer, producer) = mem_pipe();
    let (wrote, read) = tokio::join!(
        write_loop(producer, args.count, Duration::from_micros(args.pause_us)),
        read_loop(consumer, stdio.stdout()),
    );
    let shutdown = stdio.shutdown().await;
    wrote?;
    read?;
    shutdown?;
    Ok(())
}
