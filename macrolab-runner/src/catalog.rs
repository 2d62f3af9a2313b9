//! Built-in series catalogs and the macro category splits.
//!
//! Every list here can be replaced from the TOML config; these are the
//! defaults used when a config file does not name its own.

use macrolab_core::{Category, SeriesMeta};
use serde::{Deserialize, Serialize};

/// A subset of the merged macro table written to its own file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSplit {
    pub file: String,
    pub columns: Vec<String>,
}

impl MacroSplit {
    pub fn new(file: &str, columns: &[&str]) -> Self {
        Self {
            file: file.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

fn metas<'a>(
    category: Category,
    entries: &'a [(&'a str, &'a str)],
) -> impl Iterator<Item = SeriesMeta> + 'a {
    entries
        .iter()
        .map(move |(key, name)| SeriesMeta::new(*key, *name, category))
}

/// Index, sector, bond, commodity, international and volatility ETFs.
pub fn default_etfs() -> Vec<SeriesMeta> {
    let mut out = Vec::with_capacity(27);

    // Index
    out.extend(metas(
        Category::EquityEtf,
        &[
            ("SPY", "SPDR S&P 500 ETF"),
            ("QQQ", "Invesco QQQ Trust (NASDAQ-100)"),
            ("IWM", "iShares Russell 2000 ETF"),
            ("DIA", "SPDR Dow Jones Industrial Average ETF"),
        ],
    ));

    // Sector
    out.extend(metas(
        Category::EquityEtf,
        &[
            ("XLF", "Financial Select Sector SPDR"),
            ("XLK", "Technology Select Sector SPDR"),
            ("XLE", "Energy Select Sector SPDR"),
            ("XLV", "Health Care Select Sector SPDR"),
            ("XLI", "Industrial Select Sector SPDR"),
            ("XLU", "Utilities Select Sector SPDR"),
            ("XLP", "Consumer Staples Select Sector SPDR"),
            ("XLY", "Consumer Discretionary Select Sector SPDR"),
            ("XLB", "Materials Select Sector SPDR"),
            ("XLRE", "Real Estate Select Sector SPDR"),
        ],
    ));

    out.extend(metas(
        Category::BondEtf,
        &[
            ("TLT", "iShares 20+ Year Treasury Bond ETF"),
            ("IEF", "iShares 7-10 Year Treasury Bond ETF"),
            ("LQD", "iShares iBoxx Investment Grade Corporate Bond ETF"),
            ("HYG", "iShares iBoxx High Yield Corporate Bond ETF"),
            ("AGG", "iShares Core U.S. Aggregate Bond ETF"),
        ],
    ));

    out.extend(metas(
        Category::Commodity,
        &[
            ("GLD", "SPDR Gold Shares"),
            ("SLV", "iShares Silver Trust"),
            ("USO", "United States Oil Fund"),
        ],
    ));

    // International and volatility
    out.extend(metas(
        Category::EquityEtf,
        &[
            ("EEM", "iShares MSCI Emerging Markets ETF"),
            ("EFA", "iShares MSCI EAFE ETF"),
            ("VWO", "Vanguard FTSE Emerging Markets ETF"),
            ("FXI", "iShares China Large-Cap ETF"),
            ("VXX", "iPath Series B S&P 500 VIX Short-Term Futures ETN"),
        ],
    ));

    out
}

pub fn default_commodities() -> Vec<SeriesMeta> {
    metas(
        Category::Commodity,
        &[("CL=F", "Crude Oil (WTI)"), ("GC=F", "Gold"), ("HG=F", "Copper")],
    )
    .collect()
}

/// FRED series ids with their descriptions.
pub fn default_macro_series() -> Vec<SeriesMeta> {
    let mut out = Vec::with_capacity(15);
    out.extend(metas(
        Category::PriceIndex,
        &[
            ("CPIAUCSL", "CPI All Urban Consumers (Seasonally Adjusted)"),
            ("CPILFESL", "Core CPI (Less Food and Energy)"),
        ],
    ));
    out.extend(metas(
        Category::Rate,
        &[
            ("FEDFUNDS", "Federal Funds Effective Rate"),
            ("DGS10", "10-Year Treasury Constant Maturity Rate"),
            ("DGS2", "2-Year Treasury Constant Maturity Rate"),
            ("DGS30", "30-Year Treasury Constant Maturity Rate"),
            ("MORTGAGE30US", "30-Year Fixed Rate Mortgage Average"),
        ],
    ));
    out.extend(metas(
        Category::EconomicActivity,
        &[("MANEMP", "Manufacturing Employment")],
    ));
    out.extend(metas(
        Category::SurveyIndex,
        &[
            ("NAPM", "ISM Manufacturing: PMI Composite Index"),
            ("NAPMNOI", "ISM Manufacturing: New Orders Index"),
            ("NAPMPI", "ISM Manufacturing: Production Index"),
        ],
    ));
    out.extend(metas(
        Category::EconomicActivity,
        &[("UNRATE", "Unemployment Rate"), ("GDPC1", "Real GDP")],
    ));
    out.extend(metas(Category::PriceIndex, &[("PCEPI", "PCE Price Index")]));
    out.extend(metas(
        Category::Rate,
        &[("T10Y2Y", "10-Year Treasury Minus 2-Year Treasury (Yield Curve)")],
    ));
    out
}

pub fn default_macro_splits() -> Vec<MacroSplit> {
    vec![
        MacroSplit::new("cpi_data.csv", &["CPIAUCSL", "CPILFESL", "PCEPI"]),
        MacroSplit::new(
            "interest_rate_data.csv",
            &["FEDFUNDS", "DGS2", "DGS10", "DGS30", "MORTGAGE30US", "T10Y2Y"],
        ),
        MacroSplit::new("pmi_data.csv", &["NAPM", "NAPMNOI", "NAPMPI", "MANEMP"]),
    ]
}

/// `CL=F` → `cl_futures.csv`.
pub fn contract_file_name(symbol: &str) -> String {
    format!("{}_futures.csv", symbol.replace("=F", "").to_lowercase())
}
