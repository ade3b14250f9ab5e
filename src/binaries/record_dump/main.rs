use clap::Parser;
use cyber_record::{ReadOutcome, ReaderOptions, Record, TopicFilter};
use cyber_record_utils::time::{unix_nano_format, unix_nano_to_secs};
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Parser)]
#[clap(about, version, author)]
struct Config {
    #[clap(long)]
    pub path: String,

    /// Channels to print, all when empty.
    #[clap(long, value_delimiter = ',')]
    pub topics: Vec<String>,

    /// Start of the time range in nanoseconds.
    #[clap(long, default_value_t = 0)]
    pub start: u64,

    /// End of the time range in nanoseconds, inclusive.
    #[clap(long, default_value_t = u64::MAX)]
    pub end: u64,

    /// Read through a memory map instead of buffered file reads.
    #[clap(long)]
    pub mmap: bool,

    /// Only print the header and the channels.
    #[clap(long)]
    pub info: bool,

    /// Stop after this many messages.
    #[clap(long)]
    pub limit: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    println!("config: {:?}", config);
    if config.path.is_empty() {
        println!("path MUST not be empty!");
        return Ok(());
    }

    let options = ReaderOptions {
        use_mmap: config.mmap,
        ..Default::default()
    };
    let mut record = Record::open_with(config.path.as_str(), &options)?;

    println!("{}", record.header());
    println!(
        "version: {}, messages: {}, {} .. {} ({:.3}s)",
        record.version(),
        record.message_number(),
        unix_nano_format(record.start_time()),
        unix_nano_format(record.end_time()),
        unix_nano_to_secs(record.end_time().saturating_sub(record.start_time())),
    );
    for (i, channel) in record.channels().enumerate() {
        println!(
            "{:03}>{} [{}] messages={}",
            i, channel.name, channel.message_type, channel.message_number
        );
    }
    if config.info {
        return Ok(());
    }

    let topics = if config.topics.is_empty() {
        TopicFilter::all()
    } else {
        TopicFilter::only(config.topics.iter().cloned())
    };
    let limit = config.limit.unwrap_or(usize::MAX);

    let mut itr = record.read_messages(topics, config.start, config.end);
    let mut i = 0;
    while i < limit {
        match itr.next_outcome()? {
            Some(ReadOutcome::Decoded(m)) => {
                println!(
                    "{:010}>{} @{} {}",
                    i,
                    m.channel_name,
                    unix_nano_format(m.timestamp),
                    m.value
                );
                i += 1;
            }
            Some(ReadOutcome::Skipped(_)) => {}
            None => break,
        }
    }
    if itr.skipped() > 0 {
        warn!("{} messages skipped without a decoder", itr.skipped());
    }

    Ok(())
}
