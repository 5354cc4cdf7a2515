use icp_price_sync::amount::{calculate_transaction_fees, format_icp, icp_to_e8s};
use icp_price_sync::{Currency, PriceService, PriceServiceConfig};
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("ICP Price Ticker");
    println!("================");

    let service = PriceService::new(PriceServiceConfig::from_env())?;

    let subscription = service.subscribe(|snapshot| {
        if snapshot.is_loading {
            println!("Refreshing...");
            return;
        }
        let line = Currency::all()
            .iter()
            .map(|c| format!("{} {}", c, c.format_price(snapshot.rate(*c))))
            .collect::<Vec<_>>()
            .join("  |  ");
        println!("{}  ({})", line, snapshot.updated_ago());
        if let Some(error) = &snapshot.error {
            println!("  ! {}", error);
        }
    })?;

    sleep(Duration::from_secs(5)).await;

    let binding = service.bind()?;
    for amount in [1.0, 10.0, 100.0] {
        println!(
            "{:>6} ICP = {}",
            amount,
            Currency::GHS.format_price(binding.convert_from_icp(amount, Currency::GHS))
        );
    }
    match binding.convert_to_icp(500.0, Currency::GHS) {
        Ok(icp) => println!("₵500.00 = {:.4} ICP", icp),
        Err(e) => eprintln!("Conversion failed: {}", e),
    }

    let amount_e8s = icp_to_e8s(2.5)?;
    let fees = calculate_transaction_fees(amount_e8s);
    println!(
        "Sending {} ICP costs {} ICP in fees",
        format_icp(amount_e8s),
        format_icp(fees.total_fees)
    );

    println!("\nForcing a refresh...");
    binding.refresh_prices().await;

    let health = service.health_check().await;
    println!("\nHealth: {:?} - {}", health.status, health.message.unwrap_or_default());

    let metrics = service.fetch_metrics().await;
    println!(
        "Fetcher {}: p50={:.0}ms, p99={:.0}ms, success_rate={:.1}%",
        metrics.provider_name,
        metrics.latency_p50_ms,
        metrics.latency_p99_ms,
        metrics.success_rate * 100.0
    );

    subscription.unsubscribe();
    service.dispose();
    Ok(())
}
