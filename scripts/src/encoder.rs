//! Encoding of contract calls from human-readable function signatures
//!
//! A signature such as `setGovOps(address)` is parsed into an ABI fragment,
//! its parameters are resolved to Solidity types, and the arguments are
//! checked (or coerced from strings) against those types before the standard
//! ABI coder produces the selector-prefixed call-data

use std::str::FromStr;

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{Constructor, Function, Param},
    primitives::{Address, Bytes, Selector, B256},
};

use crate::errors::EncodingError;

/// The maximum number of bytes of a string packed into a `bytes32`, one byte
/// is reserved for the null terminator
const MAX_BYTES32_STRING_LEN: usize = 31;

/// Parse a function signature of the form `name(type1,type2,...)`
pub fn parse_signature(signature: &str) -> Result<Function, EncodingError> {
    Function::parse(signature).map_err(|e| EncodingError::InvalidSignature {
        signature: signature.to_string(),
        reason: e.to_string(),
    })
}

/// Compute the 4-byte selector of a function signature
pub fn selector(signature: &str) -> Result<Selector, EncodingError> {
    parse_signature(signature).map(|f| f.selector())
}

/// Encode a call to `signature` with typed arguments
pub fn encode_call(signature: &str, args: &[DynSolValue]) -> Result<Bytes, EncodingError> {
    let function = parse_signature(signature)?;
    let types = resolve_params(signature, &function.inputs)?;
    check_arity(signature, types.len(), args.len())?;
    check_types(&types, args)?;

    function
        .abi_encode_input(args)
        .map(Bytes::from)
        .map_err(|e| EncodingError::InvalidSignature {
            signature: signature.to_string(),
            reason: e.to_string(),
        })
}

/// Encode a call to `signature`, coercing each string argument to the type of
/// its parameter
pub fn encode_call_str(signature: &str, args: &[&str]) -> Result<Bytes, EncodingError> {
    let function = parse_signature(signature)?;
    let types = resolve_params(signature, &function.inputs)?;
    check_arity(signature, types.len(), args.len())?;

    let values = types
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (ty, arg))| coerce_arg(index, ty, arg))
        .collect::<Result<Vec<_>, _>>()?;

    encode_call(signature, &values)
}

/// Resolve the parameter types of a constructor, a missing constructor takes
/// no arguments
pub fn constructor_types(constructor: Option<&Constructor>) -> Result<Vec<DynSolType>, EncodingError> {
    match constructor {
        Some(c) => resolve_params("constructor", &c.inputs),
        None => Ok(Vec::new()),
    }
}

/// ABI-encode constructor arguments, without a selector, for appending to
/// creation bytecode
pub fn encode_constructor_args(
    constructor: Option<&Constructor>,
    args: &[DynSolValue],
) -> Result<Vec<u8>, EncodingError> {
    let types = constructor_types(constructor)?;
    check_arity("constructor", types.len(), args.len())?;
    check_types(&types, args)?;

    match constructor {
        Some(c) => c
            .abi_encode_input(args)
            .map_err(|e| EncodingError::InvalidSignature {
                signature: "constructor".to_string(),
                reason: e.to_string(),
            }),
        None => Ok(Vec::new()),
    }
}

/// Coerce a single string argument to the given type
///
/// Address parameters are parsed strictly so a malformed address is reported
/// as such rather than as a generic type mismatch
pub fn coerce_arg(index: usize, ty: &DynSolType, arg: &str) -> Result<DynSolValue, EncodingError> {
    if *ty == DynSolType::Address {
        return parse_address(arg).map(DynSolValue::Address);
    }

    ty.coerce_str(arg).map_err(|e| EncodingError::ArgumentType {
        index,
        expected: ty.sol_type_name().into_owned(),
        reason: e.to_string(),
    })
}

/// Parse a 20-byte hex address, with or without the `0x` prefix
pub fn parse_address(value: &str) -> Result<Address, EncodingError> {
    Address::from_str(value.trim()).map_err(|_| EncodingError::InvalidAddress(value.to_string()))
}

/// Pack a short string into a right-padded `bytes32`
pub fn string_to_bytes32(value: &str) -> Result<B256, EncodingError> {
    let bytes = value.as_bytes();
    if bytes.len() > MAX_BYTES32_STRING_LEN {
        return Err(EncodingError::Bytes32Overflow(value.to_string()));
    }

    let mut word = [0u8; 32];
    word[..bytes.len()].copy_from_slice(bytes);
    Ok(B256::from(word))
}

// -----------
// | Helpers |
// -----------

/// Resolve each parameter of an ABI fragment to its Solidity type
fn resolve_params(signature: &str, params: &[Param]) -> Result<Vec<DynSolType>, EncodingError> {
    params
        .iter()
        .map(|p| {
            p.resolve().map_err(|e| EncodingError::InvalidSignature {
                signature: signature.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Check the argument count against the parameter count
fn check_arity(signature: &str, expected: usize, actual: usize) -> Result<(), EncodingError> {
    if expected != actual {
        return Err(EncodingError::ArgumentCount {
            signature: signature.to_string(),
            expected,
            actual,
        });
    }

    Ok(())
}

/// Check each typed argument against its parameter type
fn check_types(types: &[DynSolType], args: &[DynSolValue]) -> Result<(), EncodingError> {
    for (index, (ty, value)) in types.iter().zip(args).enumerate() {
        if !ty.matches(value) {
            let actual = value
                .as_type()
                .map(|t| t.sol_type_name().into_owned())
                .unwrap_or_else(|| "an untyped value".to_string());

            return Err(EncodingError::ArgumentType {
                index,
                expected: ty.sol_type_name().into_owned(),
                reason: format!("got {actual}"),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::{
        dyn_abi::DynSolValue,
        json_abi::Constructor,
        primitives::{address, hex, keccak256, Address, U256},
    };
    use alloy_sol_types::SolCall;

    use crate::{
        errors::EncodingError,
        solidity::{addMembersToWhitelistCall, setGovOpsCall, setGovernanceParameterByAdminCall},
    };

    use super::{encode_call, encode_call_str, encode_constructor_args, selector, string_to_bytes32};

    /// An address with mixed-case checksum characters
    const GOV_OPS: Address = address!("87B5DEf0Bc3A7563782b1037A5aB5Fd30F43013F");

    #[test]
    fn test_single_address_call_layout() {
        let data = encode_call("setGovOps(address)", &[DynSolValue::Address(GOV_OPS)]).unwrap();
        let encoded = hex::encode_prefixed(&data);

        assert_eq!(encoded.len(), 10 + 64);
        assert!(encoded.ends_with(&hex::encode(GOV_OPS)));
        assert_eq!(&encoded[encoded.len() - 40..], format!("{GOV_OPS:x}").trim_start_matches("0x"));
    }

    #[test]
    fn test_matches_static_abi_encoding() {
        let dynamic = encode_call_str("setGovOps(address)", &["0x87B5DEf0Bc3A7563782b1037A5aB5Fd30F43013F"]).unwrap();
        let expected = setGovOpsCall { govOps: GOV_OPS }.abi_encode();

        assert_eq!(dynamic.to_vec(), expected);
    }

    #[test]
    fn test_address_array_layout() {
        let members = [
            address!("690BF2dB31D39EE0a88fcaC89117b66a588E865a"),
            address!("2Cd5221188390bc6e3a3BAcF7EbB7BCC0FdFC3Fe"),
            address!("96f67a852f8D3Bc05464C4F91F97aACE060e247A"),
        ];
        let value = DynSolValue::Array(members.iter().copied().map(DynSolValue::Address).collect());
        let data = encode_call("addMembersToWhitelist(address[])", &[value]).unwrap();

        let expected_selector = &keccak256("addMembersToWhitelist(address[])")[..4];
        assert_eq!(&data[..4], expected_selector);

        let words: Vec<&[u8]> = data[4..].chunks(32).collect();
        assert_eq!(words.len(), 5);
        assert_eq!(U256::from_be_slice(words[0]), U256::from(32));
        assert_eq!(U256::from_be_slice(words[1]), U256::from(3));
        for (word, member) in words[2..].iter().zip(members) {
            assert_eq!(&word[..12], &[0u8; 12]);
            assert_eq!(&word[12..], member.as_slice());
        }

        let oracle = addMembersToWhitelistCall { members: members.to_vec() }.abi_encode();
        assert_eq!(data.to_vec(), oracle);
    }

    #[test]
    fn test_governance_parameter_encoding() {
        let data = encode_call(
            "setGovernanceParameterByAdmin(bytes32,uint256)",
            &[
                DynSolValue::FixedBytes(string_to_bytes32("quorum").unwrap(), 32),
                DynSolValue::Uint(U256::from(367_300u64), 256),
            ],
        )
        .unwrap();

        let oracle = setGovernanceParameterByAdminCall {
            param: string_to_bytes32("quorum").unwrap(),
            data: U256::from(367_300u64),
        }
        .abi_encode();
        assert_eq!(data.to_vec(), oracle);
    }

    #[test]
    fn test_argument_count_mismatch() {
        let err = encode_call("setGovOps(address)", &[]).unwrap_err();
        assert_eq!(
            err,
            EncodingError::ArgumentCount { signature: "setGovOps(address)".to_string(), expected: 1, actual: 0 }
        );

        let err = encode_call_str("setGovOps(address)", &["0x01", "0x02"]).unwrap_err();
        assert!(matches!(err, EncodingError::ArgumentCount { expected: 1, actual: 2, .. }));
    }

    #[test]
    fn test_malformed_address_rejected() {
        let err = encode_call_str("setGovOps(address)", &["0x1234"]).unwrap_err();
        assert_eq!(err, EncodingError::InvalidAddress("0x1234".to_string()));

        let err = encode_call_str("setGovOps(address)", &["not an address"]).unwrap_err();
        assert!(matches!(err, EncodingError::InvalidAddress(_)));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let err = encode_call("setGovOps(address)", &[DynSolValue::Bool(true)]).unwrap_err();
        assert!(matches!(err, EncodingError::ArgumentType { index: 0, .. }));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        assert!(matches!(selector("setGovOps(address"), Err(EncodingError::InvalidSignature { .. })));
        assert!(matches!(selector("setGovOps(notatype)"), Err(EncodingError::InvalidSignature { .. })));
    }

    #[test]
    fn test_selector_matches_keccak_prefix() {
        let sel = selector("setGovExec(address)").unwrap();
        assert_eq!(sel.as_slice(), &keccak256("setGovExec(address)")[..4]);
    }

    #[test]
    fn test_bytes32_packing() {
        let word = string_to_bytes32("quorum").unwrap();
        assert_eq!(&word[..6], b"quorum");
        assert!(word[6..].iter().all(|b| *b == 0));

        let too_long = "a".repeat(32);
        assert_eq!(string_to_bytes32(&too_long), Err(EncodingError::Bytes32Overflow(too_long.clone())));
    }

    #[test]
    fn test_constructor_encoding() {
        let constructor = Constructor::parse("constructor(address,uint256,string)").unwrap();
        let args = [
            DynSolValue::Address(GOV_OPS),
            DynSolValue::Uint(U256::from(3600), 256),
            DynSolValue::String("ipfs://uri".to_string()),
        ];
        let encoded = encode_constructor_args(Some(&constructor), &args).unwrap();

        // Three head words, then the string length and one padded data word
        assert_eq!(encoded.len(), 32 * 5);
        assert_eq!(&encoded[12..32], GOV_OPS.as_slice());
        assert_eq!(U256::from_be_slice(&encoded[32..64]), U256::from(3600));
        assert_eq!(U256::from_be_slice(&encoded[64..96]), U256::from(96));

        assert!(encode_constructor_args(None, &[]).unwrap().is_empty());
        assert!(matches!(
            encode_constructor_args(None, &args),
            Err(EncodingError::ArgumentCount { expected: 0, actual: 3, .. })
        ));
    }
}
