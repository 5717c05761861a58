use anyhow::Result;

use repocast::config::Config;
use repocast::models::Category;
use repocast::pipeline::discover::deficit;
use repocast::storage::StateFiles;

/// Print queue stock per category and history size
pub fn status(config: &Config) -> Result<()> {
    let files = StateFiles::from_config(config);
    let stock = files.queue.count_by_category()?;
    let published = files.history.load()?.len();
    let minimum = config.discovery.minimum_stock;

    println!("Queue: {}", files.queue.path().display());
    for category in Category::PRIORITY {
        let count = stock.get(&category).copied().unwrap_or(0);
        println!(
            "  {} {:<10} {count:>3} queued, deficit {}",
            category.emoji(),
            category.as_str(),
            deficit(minimum, count)
        );
    }
    println!("History: {published} published");

    Ok(())
}
