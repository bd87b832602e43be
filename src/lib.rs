use std::io::{BufRead, BufReader, Read};

use clap::Parser;
use parser::lexer::token::TokenStream;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum Emit {
    Tokens,
    Ast,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
#[command(version = "0.1.0")]
#[command(about = "Hazel front end: lex and parse source files")]
#[command(long_about = None)]
pub struct Config {
    #[arg(value_name = "FILE", default_value = "-")]
    files: Vec<String>,
    /// 出力する段階
    #[arg(short, long, value_enum, default_value_t = Emit::Ast)]
    emit: Emit,
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
    /// ログの詳細度 (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// ヘルプ・バージョン表示と引数の誤りは clap が処理して終了する
pub fn get_config() -> AppResult<Config> {
    let config = Config::try_parse().unwrap_or_else(|e| e.exit());

    if config.files.iter().filter(|file| *file == "-").count() > 1 {
        return Err("standard input can only be read once".into());
    }

    Ok(config)
}

/// ファイルごとに独立して解析し、1つでも失敗すればエラーを返す
pub fn run(config: Config) -> AppResult<()> {
    init_logging(config.verbose);

    let mut failed = 0;
    for file in &config.files {
        if !process(&config, file)? {
            failed += 1;
        }
    }

    match failed {
        0 => Ok(()),
        n => Err(format!("{n} of {} input(s) failed", config.files.len()).into()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// 成功した場合は `true`
/// 入力の誤りは標準エラー出力に報告し、出力先への書き込み失敗のみをエラーとして返す
fn process(config: &Config, filename: &str) -> AppResult<bool> {
    let name = match filename {
        "-" => "<stdin>",
        _ => filename,
    };

    let source = match open(filename).and_then(read_source) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{e}");
            return Ok(false);
        }
    };
    tracing::info!(file = name, bytes = source.len(), "processing");

    let stream = parser::lex(&source, name);
    for diagnostic in stream.diagnostics() {
        eprintln!("{diagnostic}");
    }

    match config.emit {
        Emit::Tokens => emit_tokens(config.format, &stream),
        Emit::Ast => match parser::parse(&stream) {
            Ok(root) => {
                match config.format {
                    Format::Text => println!("{root}"),
                    Format::Json => println!("{}", serde_json::to_string_pretty(&root)?),
                }
                Ok(true)
            }
            Err(e) => {
                eprintln!("{}", e.to_diagnostic());
                Ok(false)
            }
        },
    }
}

/// トークン列は `Illegal` を含めて出力し、`Illegal` があれば失敗とする
fn emit_tokens(format: Format, stream: &TokenStream) -> AppResult<bool> {
    match format {
        Format::Text => {
            for token in stream {
                println!("{token}");
            }
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(stream.as_slice())?),
    }

    match stream.illegal() {
        Some(token) => {
            let error = parser::error::Error::Lexer {
                message: token.text.clone(),
                location: token.location.clone(),
            };
            eprintln!("{}", error.to_diagnostic());
            Ok(false)
        }
        None => Ok(true),
    }
}

fn open(filename: &str) -> AppResult<Box<dyn BufRead>> {
    match filename {
        "-" => Ok(Box::new(BufReader::new(std::io::stdin()))),
        _ => Ok(Box::new(BufReader::new(
            std::fs::File::open(filename).map_err(|e| format!("{}: {}", filename, e))?,
        ))),
    }
}

fn read_source(mut reader: Box<dyn BufRead>) -> AppResult<String> {
    let mut source = String::new();
    reader.read_to_string(&mut source)?;

    Ok(source)
}
