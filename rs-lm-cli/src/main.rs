use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::debug;
use reqwest::blocking::Client;
use reqwest::Result;
use serde_json::{json, Value};

use rs_lm_core::tokenizer::whitespace::WhitespaceTokenizer;
use rs_lm_core::tokenizer::Tokenizer;

#[derive(Parser)]
#[command(name = "rs-lm", version, about = "Client for the rs-lm n-gram language model server")]
struct Cli {
    /// Base URL of the server API
    #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:5000/v1", global = true)]
    api_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from a corpus file on the server
    Train(TrainArgs),
    /// Generate text from a prompt
    Run(RunArgs),
    /// Inspect the currently loaded model
    Info,
    /// Load a previously trained artifact on the server
    Load(LoadArgs),
    /// Tokenize text locally, without a server round trip
    Tokenize(TokenizeArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Corpus file path, as seen by the server
    #[arg(long, value_name = "PATH")]
    corpus: String,

    /// Output path for the trained artifact
    #[arg(long, value_name = "PATH", default_value = "data/model.bin")]
    output: String,

    /// N-gram order to train at
    #[arg(long, default_value_t = 3)]
    order: usize,

    /// Tokenizer kind (whitespace or code)
    #[arg(long, default_value = "whitespace")]
    tokenizer: String,
}

#[derive(Args)]
struct RunArgs {
    /// Prompt used to seed the generation
    #[arg(short, long)]
    prompt: String,

    /// Maximum number of tokens to generate
    #[arg(long, default_value_t = 20)]
    max_tokens: usize,

    /// Sampling temperature
    #[arg(long, default_value_t = 1.0)]
    temperature: f64,

    /// Keep only the k most probable tokens at each step (0 disables)
    #[arg(long, default_value_t = 50)]
    top_k: usize,

    /// Random seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Stop generating when the text ends with this (repeat flag)
    #[arg(long = "stop", value_name = "TEXT")]
    stop_sequences: Vec<String>,
}

#[derive(Args)]
struct LoadArgs {
    /// Artifact file path, as seen by the server
    #[arg(long, value_name = "PATH")]
    artifact: String,

    /// Smoothing strategy (backoff or kneser-ney)
    #[arg(long, default_value = "backoff")]
    smoothing: String,
}

#[derive(Args)]
struct TokenizeArgs {
    /// Text to tokenize
    text: String,
}

/// REST context holding a reusable blocking HTTP client.
struct RESTContext {
    client: Client,
    api_base: String,
}

impl RESTContext {
    /// Creates a new REST context with a timeout.
    fn new(api_base: String) -> Result<Self> {
        debug!("API base: {api_base}");
        let client = Client::builder()
            .timeout(Duration::new(5, 0))
            .build()?;
        Ok(Self { client, api_base })
    }

    /// Sends a POST request to `/v1/generate` with a JSON body.
    fn post_generate(&self, body: &Value) -> Result<Value> {
        self.client
            .post(format!("{}/generate", self.api_base))
            .json(body)
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a POST request to `/v1/train` with a JSON body.
    fn post_train(&self, body: &Value) -> Result<Value> {
        self.client
            .post(format!("{}/train", self.api_base))
            .json(body)
            .send()?
            .error_for_status()?
            .json()
    }

    /// Sends a PUT request to `/v1/load_model` with a JSON body.
    fn put_load_model(&self, body: &Value) -> Result<String> {
        self.client
            .put(format!("{}/load_model", self.api_base))
            .json(body)
            .send()?
            .error_for_status()?
            .text()
    }

    /// Sends a GET request to `/v1/model`.
    fn get_model(&self) -> Result<Value> {
        self.client
            .get(format!("{}/model", self.api_base))
            .send()?
            .error_for_status()?
            .json()
    }
}

/// Renders a JSON field for display, without quotes around strings.
fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".to_owned(),
    }
}

fn run_train(rest: &RESTContext, args: TrainArgs) -> Result<()> {
    println!("Training model...");
    println!("  Corpus: {}", args.corpus);
    println!("  Output: {}", args.output);

    let body = json!({
        "corpusPath": args.corpus,
        "outputPath": args.output,
        "order": args.order,
        "tokenizer": args.tokenizer,
    });
    let result = rest.post_train(&body)?;

    println!();
    println!("Training complete");
    println!("  Model: {}", field(&result, "model"));
    println!("  Vocabulary: {}", field(&result, "vocabSize"));
    println!("  Latency: {}ms", field(&result, "latencyMs"));
    Ok(())
}

fn run_generate(rest: &RESTContext, args: RunArgs) -> Result<()> {
    let mut body = json!({
        "prompt": args.prompt,
        "maxTokens": args.max_tokens,
        "temperature": args.temperature,
        "topK": args.top_k,
        "stopSequences": args.stop_sequences,
    });
    if let Some(seed) = args.seed {
        body["seed"] = json!(seed);
    }

    let result = rest.post_generate(&body)?;

    println!("{}", field(&result, "generatedText"));
    if let Some(usage) = result.get("usage") {
        println!();
        println!("Usage:");
        println!("  Input:  {} tokens", field(usage, "inputTokens"));
        println!("  Output: {} tokens", field(usage, "outputTokens"));
        println!("  Total:  {} tokens", field(usage, "totalTokens"));
    }
    println!("  Latency: {}ms ({})", field(&result, "latencyMs"), field(&result, "model"));
    Ok(())
}

fn run_info(rest: &RESTContext) -> Result<()> {
    let result = rest.get_model()?;

    println!("Loaded model");
    println!("  Model: {}", field(&result, "model"));
    println!("  Order: {}", field(&result, "order"));
    println!("  Vocabulary: {}", field(&result, "vocabSize"));
    println!("  Tokens seen: {}", field(&result, "totalTokens"));
    println!("  N-grams: {}", field(&result, "totalNgrams"));
    println!("  Tokenizer: {}", field(&result, "tokenizer"));
    println!("  Smoothing: {}", field(&result, "smoothing"));
    println!("  Trained at: {}", field(&result, "trainedAt"));
    println!("  Corpus: {}", field(&result, "corpusInfo"));
    Ok(())
}

fn run_load(rest: &RESTContext, args: LoadArgs) -> Result<()> {
    let body = json!({
        "artifactPath": args.artifact,
        "smoothing": args.smoothing,
    });
    println!("{}", rest.put_load_model(&body)?);
    Ok(())
}

fn run_tokenize(args: TokenizeArgs) {
    let tokenizer = WhitespaceTokenizer::from_corpus(&args.text);
    let ids = tokenizer.encode(&args.text);
    let tokens: Vec<&str> = args.text.split_whitespace().collect();

    println!("Text: \"{}\"", args.text);
    println!("Tokens ({}): [{}]", tokens.len(), tokens.join(", "));
    println!("Ids: {ids:?}");
}

/// Application entry point.
fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Train(args) => {
            RESTContext::new(cli.api_base).and_then(|rest| run_train(&rest, args))
        }
        Commands::Run(args) => {
            RESTContext::new(cli.api_base).and_then(|rest| run_generate(&rest, args))
        }
        Commands::Info => RESTContext::new(cli.api_base).and_then(|rest| run_info(&rest)),
        Commands::Load(args) => {
            RESTContext::new(cli.api_base).and_then(|rest| run_load(&rest, args))
        }
        Commands::Tokenize(args) => {
            run_tokenize(args);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
