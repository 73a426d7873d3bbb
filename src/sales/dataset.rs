use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use rust_decimal::Decimal;

use super::transaction::Transaction;
use super::NoDataError;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductTotal {
    pub item: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestAndWorst {
    pub best: ProductTotal,
    pub worst: ProductTotal,
}

/// The cleaned transactions of one session.
///
/// Built once by the loader and never mutated afterwards; every query below
/// borrows it immutably and returns a freshly computed view.
#[derive(Debug, Default, Clone)]
pub struct SalesData {
    transactions: Vec<Transaction>,
}

impl SalesData {
    pub fn new(transactions: Vec<Transaction>) -> SalesData {
        SalesData { transactions }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn available_years(&self) -> BTreeSet<i32> {
        self.transactions.iter().map(Transaction::year).collect()
    }

    pub fn available_products(&self) -> BTreeSet<String> {
        self.transactions.iter().map(|tx| tx.item().clone()).collect()
    }

    /// Transactions of `item` in `year`, in source order.
    pub fn filter_by_year_and_product(&self, year: i32, item: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.year() == year && tx.item() == item)
            .collect()
    }

    pub fn monthly_sales_for_product(&self, year: i32, item: &str) -> BTreeMap<u32, Decimal> {
        sum_by(self.filter_by_year_and_product(year, item), Transaction::month)
    }

    pub fn yearly_sales_totals(&self) -> BTreeMap<i32, Decimal> {
        sum_by(&self.transactions, Transaction::year)
    }

    /// Sales grouped by `(year, month)` across all products.
    pub fn monthly_sales_by_year(&self) -> BTreeMap<(i32, u32), Decimal> {
        sum_by(&self.transactions, |tx| (tx.year(), tx.month()))
    }

    pub fn monthly_sales_for_year(&self, year: i32) -> BTreeMap<u32, Decimal> {
        sum_by(self.in_year(year), Transaction::month)
    }

    pub fn product_totals_for_year(&self, year: i32) -> BTreeMap<String, Decimal> {
        sum_by(self.in_year(year), |tx| tx.item().clone())
    }

    /// Products with the highest and lowest totals in `year`.
    ///
    /// Products are visited in lexical order and a tie keeps the product seen
    /// first, so with a single product it is both best and worst.
    pub fn best_and_worst_product(&self, year: i32) -> Result<BestAndWorst, NoDataError> {
        let totals = self.product_totals_for_year(year);
        let mut entries = totals.into_iter();

        let (item, total) = entries.next().ok_or(NoDataError { year })?;
        let first = ProductTotal { item, total };
        let mut best = first.clone();
        let mut worst = first;

        for (item, total) in entries {
            if total > best.total {
                best = ProductTotal { item: item.clone(), total };
            }
            if total < worst.total {
                worst = ProductTotal { item, total };
            }
        }

        Ok(BestAndWorst { best, worst })
    }

    fn in_year(&self, year: i32) -> impl Iterator<Item = &Transaction> + '_ {
        self.transactions.iter().filter(move |tx| tx.year() == year)
    }
}

fn sum_by<'a, K, I, F>(transactions: I, key: F) -> BTreeMap<K, Decimal>
where
    K: Ord,
    I: IntoIterator<Item = &'a Transaction>,
    F: Fn(&Transaction) -> K,
{
    let mut sums = BTreeMap::new();
    for tx in transactions {
        let sum = sums.entry(key(tx)).or_insert(Decimal::ZERO);
        let current = *sum;
        *sum = current.checked_add(tx.price()).unwrap_or_else(|| {
            warn!("sales total out of range, saturating, item={}, date={}", tx.item(), tx.order_date());
            current.saturating_add(tx.price())
        });
    }

    sums
}
