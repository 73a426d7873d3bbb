use std::env;
use std::io;

use anyhow::{Context, Result};
use log::warn;

use cafe_sales::data::{self, Source};
use cafe_sales::sales::dataset::SalesData;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 4 {
        eprintln!("Usage: cargo run -- <input_file> [year] [item]");
        std::process::exit(1);
    }

    let sales = match data::load(Source::from_path(&args[1])) {
        Ok(sales) => sales,
        Err(err) => {
            eprintln!("failed to load {}: {}", args[1], err);
            std::process::exit(1);
        },
    };

    let year = match args.get(2) {
        Some(year) => year.parse::<i32>().with_context(|| format!("invalid year {:?}", year))?,
        None => *sales.available_years().first().context("no years available")?,
    };
    let item = match args.get(3) {
        Some(item) => item.clone(),
        None => sales.available_products().first().cloned().context("no products available")?,
    };

    print_report(&sales, year, &item)
}

fn print_report(sales: &SalesData, year: i32, item: &str) -> Result<()> {
    let filtered = sales.filter_by_year_and_product(year, item);
    if filtered.is_empty() {
        warn!("no sales of {} in {}", item, year);
    } else {
        println!("# {} sales of {}", year, item);
        data::export_transactions(&filtered, io::stdout().lock())?;

        println!("# {} monthly sales of {}", year, item);
        data::export_monthly_sales(sales.monthly_sales_for_product(year, item), io::stdout().lock())?;
    }

    println!("# yearly sales");
    data::export_yearly_sales(sales.yearly_sales_totals(), io::stdout().lock())?;

    let monthly = sales.monthly_sales_for_year(year);
    if monthly.is_empty() {
        warn!("no monthly sales in {}", year);
    } else {
        println!("# {} monthly sales", year);
        data::export_monthly_sales(monthly, io::stdout().lock())?;
    }

    match sales.best_and_worst_product(year) {
        Ok(result) => {
            println!("# {} sales by product", year);
            data::export_product_sales(sales.product_totals_for_year(year), io::stdout().lock())?;

            println!("# {} best and worst sellers", year);
            data::export_best_and_worst(&result, io::stdout().lock())?;
        },
        Err(err) => warn!("{}", err),
    }

    Ok(())
}
