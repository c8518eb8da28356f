//! Default definitions catalog: `(name, abbreviation, suffix)`.

pub const DEFAULT_DEFINITIONS: &[(&str, &str, &str)] = &[
    ("Euro", "EUR", "EUR"),
    ("US Dollar", "USD", "USD"),
    ("British Pound", "GBP", "GBP"),
    ("Swiss Franc", "CHF", "CHF"),
    ("Japanese Yen", "JPY", "JPY"),
    ("Canadian Dollar", "CAD", "CAD"),
    ("Australian Dollar", "AUD", "AUD"),
    ("Chinese Yuan", "CNY", "CNY"),
    ("Swedish Krona", "SEK", "SEK"),
    ("Norwegian Krone", "NOK", "NOK"),
    ("Bitcoin", "BTC", "BTC"),
    ("Ethereum", "ETH", "ETH"),
    ("Tether", "USDT", "USDT"),
    ("USD Coin", "USDC", "USDC"),
    ("Solana", "SOL", "SOL"),
    ("Cardano", "ADA", "ADA"),
    ("Ripple", "XRP", "XRP"),
    ("Polkadot", "DOT", "DOT"),
    ("Litecoin", "LTC", "LTC"),
    ("Dogecoin", "DOGE", "DOGE"),
    ("Gold", "XAU", "XAU"),
    ("Silver", "XAG", "XAG"),
];
