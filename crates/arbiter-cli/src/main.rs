use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use arbiter_core::app::{DispatchConfig, Dispatcher, DispatcherBuilder, Registration};
use arbiter_core::bind::{Arguments, Method};
use arbiter_core::domain::types;
use arbiter_core::domain::{Activity, DispatchError, Value};
use arbiter_core::impls::{KeywordModel, KeywordRecognizer};
use arbiter_core::ports::{Recognizer, ResolverExt, ResolverRef};
use arbiter_core::scorable::DispatchHooks;
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arbiter", version, about = "Dispatch stdin lines to a demo handler set")]
struct Args {
    /// Dispatcher config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keyword recognizer model (JSON); a small built-in model is used otherwise
    #[arg(long)]
    model: Option<PathBuf>,
}

/// 勝者の score と取りこぼしをログに出す hooks
struct Trace;

#[async_trait]
impl DispatchHooks<ResolverRef, f64> for Trace {
    async fn before_post(&self, _item: &ResolverRef, score: &f64) -> Result<(), DispatchError> {
        debug!(score, "winner selected");
        Ok(())
    }

    async fn on_unhandled(&self, item: &ResolverRef) -> Result<(), DispatchError> {
        debug!(text = ?item.resolve_text(), "no handler took the activity");
        Ok(())
    }
}

fn demo_model() -> KeywordModel {
    KeywordModel::default()
        .intent("greet", ["hello", "hi", "hey", "good morning"])
        .intent("weather", ["weather", "forecast", "rain", "sunny"])
        .entity("city", ["paris", "tokyo", "london", "new york"])
}

fn say(name: &'static str, line: &'static str) -> Method {
    Method::from_fn(name, move |_, _| async move {
        println!("{line}");
        Ok::<_, DispatchError>(())
    })
}

fn demo_dispatcher(
    config: DispatchConfig,
    recognizer: Arc<dyn Recognizer>,
) -> Result<Dispatcher, Box<dyn Error>> {
    let call = Method::from_fn("call", |args: Arguments, _| async move {
        println!("calling {}...", args.text("who").unwrap_or("nobody"));
        Ok::<_, DispatchError>(())
    })
    .param("who", &types::TEXT);

    // city は entity が 1 つだけ見つかった時に入る
    let forecast = Method::from_fn("forecast", |args: Arguments, _| async move {
        match args.get("city").and_then(Value::as_text) {
            Some(city) => println!("sunny in {city}, probably"),
            None => println!("which city?"),
        }
        Ok::<_, DispatchError>(())
    })
    .optional("city", &types::ENTITY);

    let dispatcher = DispatcherBuilder::new()
        .config(config)
        .hooks(Trace)
        .register(
            Registration::new(say("joke", "There are 10 kinds of people..."))
                .in_band(0)
                .on_pattern(r"\bjoke\b"),
        )?
        .register(
            Registration::new(call)
                .in_band(0)
                .on_pattern(r"^call (?P<who>\w+)"),
        )?
        .register(
            Registration::new(say("greet", "hello there!"))
                .in_band(1)
                .on_intent(Arc::clone(&recognizer), "greet"),
        )?
        .register(
            Registration::new(forecast)
                .in_band(1)
                .on_intent(recognizer, "weather"),
        )?
        .register(
            Registration::new(say("help", "try: joke, call <name>, hello, weather in <city>"))
                .in_band(9),
        )?
        .expect_handlers(&["joke", "call", "greet", "forecast", "help"])
        .build()?;
    Ok(dispatcher)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // stdout は handler の出力用なので、ログは stderr へ
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // (A) 設定と recognizer model を読み込む
    let config = match &args.config {
        Some(path) => DispatchConfig::load_from(path).await?,
        None => DispatchConfig::default(),
    };
    let model = match &args.model {
        Some(path) => KeywordModel::from_json_str(&tokio::fs::read_to_string(path).await?)?,
        None => demo_model(),
    };
    let recognizer: Arc<dyn Recognizer> = Arc::new(KeywordRecognizer::new("keywords", model));

    // (B) handler を登録して dispatcher を組み立てる（足りなければここで失敗）
    let dispatcher = demo_dispatcher(config, recognizer)?;
    eprintln!("handlers: {}", dispatcher.handlers().join(", "));

    // (C) Ctrl-C で実行中の pass をキャンセル
    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        }
    });

    // (D) 1 行 = 1 message activity
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match dispatcher.dispatch(Activity::message(line), &token).await {
            Ok(outcome) if outcome.is_handled() => println!("[handled]"),
            Ok(_) => println!("[unhandled]"),
            Err(e) if e.is_cancelled() => {
                eprintln!("cancelled");
                break;
            }
            Err(e) => eprintln!("dispatch failed: {e}"),
        }
    }

    Ok(())
}
