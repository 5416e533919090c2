use ethers::abi::{parse_abi, Abi, RawLog, Token};
use ethers::types::{Address, Bytes, Filter, Log, U256};

use crate::{types::RelayEvent, Error};

/// Human-readable interface shared by every bridge deployment.
pub const BRIDGE_ABI: &[&str] = &[
    "event Sent(uint256 messageId, uint256 chainId, address destination, address from, address to, uint256 amount)",
    "function accept(uint256 messageId, uint256 chainId, address source, address from, address to, uint256 amount)",
];

const SENT_EVENT: &str = "Sent";
const ACCEPT_FUNCTION: &str = "accept";

/// Bridge contract handle: the deployed address plus the ABI used to decode
/// `Sent` logs and encode `accept` calls.
#[derive(Debug, Clone)]
pub struct BridgeContract {
    address: Address,
    abi: Abi,
}

impl BridgeContract {
    pub fn new(address: Address) -> Result<Self, Error> {
        Self::from_signatures(address, BRIDGE_ABI)
    }

    pub fn with_abi(address: Address, signatures: &[String]) -> Result<Self, Error> {
        let signatures: Vec<&str> = signatures.iter().map(String::as_str).collect();
        Self::from_signatures(address, &signatures)
    }

    fn from_signatures(address: Address, signatures: &[&str]) -> Result<Self, Error> {
        let abi = parse_abi(signatures)
            .map_err(|e| Error::Config(format!("Invalid bridge ABI: {}", e)))?;
        Ok(Self { address, abi })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Log filter matching this contract's `Sent` notifications.
    pub fn sent_filter(&self) -> Result<Filter, Error> {
        let event = self
            .abi
            .event(SENT_EVENT)
            .map_err(|e| Error::Config(format!("Bridge ABI has no Sent event: {}", e)))?;

        Ok(Filter::new().address(self.address).topic0(event.signature()))
    }

    /// Decodes the six positional `Sent` fields plus the originating tx hash.
    pub fn decode_sent(
        &self,
        log: &Log,
        observed_on: u64,
        destination_chain_id: u64,
    ) -> Result<RelayEvent, Error> {
        let event = self
            .abi
            .event(SENT_EVENT)
            .map_err(|e| Error::Decoding(e.to_string()))?;

        let parsed = event
            .parse_log(RawLog {
                topics: log.topics.clone(),
                data: log.data.to_vec(),
            })
            .map_err(|e| Error::Decoding(format!("Malformed Sent log: {}", e)))?;

        let mut values = parsed.params.into_iter().map(|param| param.value);

        Ok(RelayEvent {
            message_id: next_uint(&mut values, "messageId")?,
            origin_chain_id: next_uint(&mut values, "chainId")?,
            destination: next_address(&mut values, "destination")?,
            from: next_address(&mut values, "from")?,
            to: next_address(&mut values, "to")?,
            amount: next_uint(&mut values, "amount")?,
            source_tx_hash: log.transaction_hash,
            observed_on,
            destination_chain_id,
        })
    }

    /// Call data for `accept(messageId, chainId, source, from, to, amount)`.
    pub fn encode_accept(&self, event: &RelayEvent) -> Result<Bytes, Error> {
        let function = self
            .abi
            .function(ACCEPT_FUNCTION)
            .map_err(|e| Error::Encoding(e.to_string()))?;

        let data = function
            .encode_input(&accept_tokens(event))
            .map_err(|e| {
                Error::Encoding(format!(
                    "Cannot encode accept for message {}: {}",
                    event.message_id, e
                ))
            })?;

        Ok(Bytes::from(data))
    }

    /// Inverse of [`BridgeContract::encode_accept`], selector included.
    pub fn decode_accept(&self, data: &[u8]) -> Result<Vec<Token>, Error> {
        let function = self
            .abi
            .function(ACCEPT_FUNCTION)
            .map_err(|e| Error::Decoding(e.to_string()))?;

        if data.len() < 4 || data[..4] != function.short_signature() {
            return Err(Error::Decoding("Call data is not an accept call".to_string()));
        }

        function
            .decode_input(&data[4..])
            .map_err(|e| Error::Decoding(e.to_string()))
    }
}

/// `accept` arguments in declaration order.
pub fn accept_tokens(event: &RelayEvent) -> Vec<Token> {
    vec![
        Token::Uint(event.message_id),
        Token::Uint(event.origin_chain_id),
        Token::Address(event.destination),
        Token::Address(event.from),
        Token::Address(event.to),
        Token::Uint(event.amount),
    ]
}

fn next_uint(values: &mut impl Iterator<Item = Token>, field: &str) -> Result<U256, Error> {
    values
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| Error::Decoding(format!("Sent.{} is missing or not a uint", field)))
}

fn next_address(values: &mut impl Iterator<Item = Token>, field: &str) -> Result<Address, Error> {
    values
        .next()
        .and_then(Token::into_address)
        .ok_or_else(|| Error::Decoding(format!("Sent.{} is missing or not an address", field)))
}
