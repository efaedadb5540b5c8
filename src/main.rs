use streamlink::{
    ConnectorConfig, Pipeline, StreamConnector, sink::FileSink, source, transform::CsvToJsonLines,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_else(|| "input.csv".to_string());
    let output = args.next().unwrap_or_else(|| "output.jsonl".to_string());

    // STREAMLINK_CONFIG may point at a JSON connector config.
    let config = match std::env::var_os("STREAMLINK_CONFIG") {
        Some(path) => ConnectorConfig::from_json_file(path)?,
        None => ConnectorConfig::default(),
    };
    let connector = StreamConnector::new(config)?;

    let mut transformer = CsvToJsonLines::new();
    let monitor = transformer.monitor();

    info!(%input, %output, "converting CSV to JSON Lines");
    let report = Pipeline::new(
        &connector,
        source::file::file(&input),
        move |input, output| transformer.transform(input, output),
        Box::new(FileSink::new(&output)),
    )
    .run()
    .await?;

    let duration_ms = report.elapsed.as_millis();
    let records = report.output;
    println!(
        "Operation took {}ms for {} records ({:.4}ms/record)",
        duration_ms,
        records,
        duration_ms as f64 / records.max(1) as f64
    );
    println!(
        "Read {} bytes, wrote {} bytes",
        monitor.bytes_read(),
        report.bytes_written
    );

    Ok(())
}
