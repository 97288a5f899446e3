//! Interactive stdin/stdout chat loop over the turn processor.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use sierra_agent::llm::{LlmClient, OpenAiCompatClient};
use sierra_agent::{ConversationState, TurnProcessor};
use sierra_core::config::{AppConfig, LoadOptions};
use sierra_core::{CatalogIndex, ServiceAdapter};
use sierra_store::JsonStore;

pub fn run() -> ExitCode {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("sierra chat: {error}");
            return ExitCode::from(2);
        }
    };

    let store = match JsonStore::load(&config.data.catalog_path, &config.data.orders_path) {
        Ok(store) => Arc::new(store),
        Err(error) => {
            eprintln!("sierra chat: {error}");
            return ExitCode::from(2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("sierra chat: failed to initialize async runtime: {error}");
            return ExitCode::from(1);
        }
    };

    let catalog = CatalogIndex::new(store.product_names());
    let llm = OpenAiCompatClient::from_config(&config.llm)
        .map(|client| Arc::new(client) as Arc<dyn LlmClient>);
    let services: Arc<dyn ServiceAdapter> = store;
    let processor = TurnProcessor::new(&config, catalog, services, llm);

    println!("Welcome to Sierra Outfitters! Type 'exit', 'quit', or 'bye' to leave.\n");

    let stdin = io::stdin();
    let mut state: Option<ConversationState> = None;
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                eprintln!("sierra chat: {error}");
                return ExitCode::from(1);
            }
        }

        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let turn = runtime.block_on(processor.process(state.take(), message));
        println!("{}\n", turn.reply);

        let terminated = turn.state.is_terminated();
        state = Some(turn.state);
        if terminated {
            break;
        }
    }

    ExitCode::SUCCESS
}
