use apphub_primitives::{constants::supported_chains, TokenMeta};
use ethers::types::Address;

fn meta(name: &str, symbol: &str, address: &str) -> TokenMeta {
    TokenMeta {
        name: name.into(),
        symbol: symbol.into(),
        address: address.parse::<Address>().expect("built-in token address is valid"),
    }
}

/// The hub-managed tokens deployed on `chain_id`
pub fn builtin_tokens(chain_id: u64) -> Vec<TokenMeta> {
    match chain_id {
        supported_chains::MONAD_TESTNET => vec![
            meta("USDC Token", "USDC", "0x2Ea973542a227E9ee0ad754Bef78e673d10eD93F"),
            meta("Tether Token", "USDT", "0x024Ba065Eeeb8C0ADBb9be64d4E58BF9CdfDdf61"),
            meta("Bitcoin", "BTC", "0x6CA1DF273345c2BD103cCc5f2f7B8b38bBCb3b70"),
            meta("Ethereum", "ETH", "0xE1eA01fB5aE3066D56ab778cC03d4700975eFCbC"),
        ],
        supported_chains::SEPOLIA => vec![
            meta("USDC Token", "USDC", "0x69Ab00d96FD2605C20d4FB15C348A7561826212e"),
            meta("Tether Token", "USDT", "0x31D4d520c397B3169627dE49a8065A470A9ADbf3"),
            meta("Bitcoin", "BTC", "0x24106438a4EdBDaAb3ec42A258A8B52bB9813CbC"),
            meta("Ethereum", "ETH", "0x5f3b4c60780545aCe26dB30B76691D13E0cEC2a5"),
        ],
        _ => vec![],
    }
}

/// Looks up a built-in token by its symbol, case-insensitively
pub fn find_token(chain_id: u64, symbol: &str) -> Option<TokenMeta> {
    builtin_tokens(chain_id).into_iter().find(|t| t.symbol.eq_ignore_ascii_case(symbol))
}
