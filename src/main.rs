use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use intent_router::{
    agent::{Agent, Reply},
    config::Config,
    dispatch::{DispatchConfig, ResponseDispatcher, ResponseSink},
    llm::OllamaClient,
    logging::init_logging,
    retrieval::VectorRetriever,
    routing::{IntentMode, IntentOrchestrator},
    session::{new_session_id, InMemorySessionStore},
    tools::{HttpToolExecutor, ToolRegistry},
};

/// Chat with intent routing over a knowledge base and tool backend
#[derive(Debug, Parser)]
#[command(name = "intent-router", version, about)]
struct Cli {
    /// Session identifier; a fresh one is generated when omitted
    #[arg(long)]
    session: Option<String>,

    /// Intent mode for new sessions (rule or llm)
    #[arg(long)]
    mode: Option<IntentMode>,

    /// Knowledge index file, overrides KNOWLEDGE_INDEX_PATH
    #[arg(long)]
    index: Option<PathBuf>,
}

/// Writes the answer to stdout as it streams.
struct StdoutSink;

impl ResponseSink for StdoutSink {
    fn token(&mut self, token: &str) {
        print!("{}", token);
        let _ = std::io::stdout().flush();
    }

    fn tool_summary(&mut self, summary: &str) {
        println!("🛠️ 工具调用结果：\n{}\n", summary);
    }

    fn notice(&mut self, notice: &str) {
        println!("{}", notice);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(mode) = cli.mode {
        config.routing.default_mode = mode;
    }
    if let Some(index) = cli.index {
        config.retrieval.index_path = index;
    }

    init_logging(&config.logging);

    let session_id = cli.session.unwrap_or_else(new_session_id);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        session_id = %session_id,
        mode = %config.routing.default_mode,
        "Intent router starting..."
    );

    let ollama = match OllamaClient::new(&config.llm, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.llm.base_url, model = %config.llm.chat_model, "Ollama client initialized");
            Arc::new(c)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Ollama client");
            return Err(e.into());
        }
    };

    let retriever = Arc::new(VectorRetriever::new(ollama.clone()));
    if let Err(e) = retriever.load(&config.retrieval.index_path).await {
        error!(error = %e, "Failed to load knowledge index");
        eprintln!(
            "Knowledge index could not be loaded from {}.\n\
             Build the index with your embedding pipeline first, then point \
             KNOWLEDGE_INDEX_PATH (or --index) at the resulting JSON file.",
            config.retrieval.index_path.display()
        );
        return Err(e.into());
    }

    let executor = match HttpToolExecutor::new(&config.tools, config.request.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            error!(error = %e, "Failed to initialize tool executor");
            return Err(e.into());
        }
    };

    match executor.health().await {
        Ok(health) => info!(
            base_url = %config.tools.base_url,
            status = %health.status,
            version = %health.version,
            "Tool backend reachable"
        ),
        Err(e) => warn!(
            base_url = %config.tools.base_url,
            error = %e,
            "Tool backend health check failed, tool calls may fail"
        ),
    }

    let registry = Arc::new(ToolRegistry::new());
    info!(tools = registry.len(), "Tool registry initialized");

    let orchestrator = IntentOrchestrator::new(registry).with_llm(ollama.clone());
    let dispatcher = ResponseDispatcher::new(
        ollama,
        retriever,
        executor,
        DispatchConfig::from(&config),
    );
    let agent = Agent::new(
        orchestrator,
        dispatcher,
        Arc::new(InMemorySessionStore::new()),
        config.routing.default_mode,
    );

    print_banner(agent.default_mode());
    run(&agent, &session_id).await?;

    info!("Intent router shutdown complete");
    Ok(())
}

async fn run(agent: &Agent, session_id: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sink = StdoutSink;

    loop {
        print!("\n👤 你：");
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 收到中断信号，正在退出...");
                return Ok(());
            }
        };

        // EOF
        let Some(line) = line else {
            return Ok(());
        };

        let reply = tokio::select! {
            reply = agent.handle_input(session_id, &line, &mut sink) => reply,
            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 收到中断信号，正在退出...");
                return Ok(());
            }
        };

        match reply {
            Ok(Reply::Exit) => {
                println!("👋 再见！");
                return Ok(());
            }
            Ok(Reply::Cleared) => println!("🧹 对话记忆已重置"),
            Ok(Reply::ModeChanged(mode)) => println!("🔄 意图分析模式：{}", mode),
            Ok(Reply::Answered { .. }) => println!(),
            Ok(Reply::Empty) => {}
            Err(e) => {
                error!(error = %e, "Query failed");
                println!("\n❌ AI响应错误: {}", e);
            }
        }
    }
}

fn print_banner(mode: IntentMode) {
    println!("🤖 智能助手已启动（意图分析模式：{}）", mode);
    println!("- 输入 'mode llm' 切换为LLM意图分析");
    println!("- 输入 'mode rule' 切换为规则判断");
    println!("- 输入 'clear' 重置对话，'exit' 退出");
}
