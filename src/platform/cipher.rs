//! Signature cipher deciphering for the YouTube player
//!
//! The player program ships a minified function that unscrambles the `s`
//! value of a ciphered format. Its name and its helper object change with
//! every player release, so they are located through stable literal
//! anchors (`"signature",` and `a=a.split("")`) and the helper calls are
//! compiled into a short list of character-array operations that run
//! without any script engine.
//!
//! Known limitation: the entry anchor is a single fixed literal. A player
//! that stops using it yields [`CipherState::NoCipher`] with no fallback.

use crate::error::ScanError;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// Query parameter used when a cipher entry does not name one
pub const DEFAULT_SIGNATURE_PARAM: &str = "signature";

const IDENT: &str = r"[a-zA-Z0-9$_]+";

/// One ciphered format entry, parsed from its `signatureCipher` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSpec {
    /// The scrambled authorization value (`s`)
    pub scrambled_value: String,
    /// Query parameter that carries the deciphered value (`sp`)
    pub signature_param: String,
    /// Media address the signature is appended to (`url`)
    pub target_address: String,
}

impl CipherSpec {
    /// Parse a url-encoded `s=..&sp=..&url=..` cipher string
    pub fn parse(signature_cipher: &str) -> Result<Self, ScanError> {
        let mut scrambled = None;
        let mut param = None;
        let mut target = None;

        for (key, value) in url::form_urlencoded::parse(signature_cipher.as_bytes()) {
            match key.as_ref() {
                "s" => scrambled = Some(value.into_owned()),
                "sp" => param = Some(value.into_owned()),
                "url" => target = Some(value.into_owned()),
                _ => {}
            }
        }

        let scrambled_value = scrambled
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ScanError::ParseFailure("cipher entry has no `s` value".to_string()))?;
        let target_address = target
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ScanError::ParseFailure("cipher entry has no `url` value".to_string()))?;

        Ok(Self {
            scrambled_value,
            signature_param: param
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_SIGNATURE_PARAM.to_string()),
            target_address,
        })
    }

    /// Target address with `signature` appended as the signature parameter
    pub fn signed_address(&self, signature: &str) -> Result<String, ScanError> {
        let mut url = Url::parse(&self.target_address)?;
        url.query_pairs_mut()
            .append_pair(&self.signature_param, signature);
        Ok(url.to_string())
    }
}

/// A single operation over the scrambled character array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Reverse the whole array
    Reverse,
    /// Remove the first `n` characters
    Splice(usize),
    /// Swap the first character with the one at `n % len`
    Swap(usize),
}

impl Instruction {
    fn apply(&self, chars: &mut Vec<char>) {
        match *self {
            Instruction::Reverse => chars.reverse(),
            Instruction::Splice(n) => {
                let n = n.min(chars.len());
                chars.drain(..n);
            }
            Instruction::Swap(n) => {
                if !chars.is_empty() {
                    let idx = n % chars.len();
                    chars.swap(0, idx);
                }
            }
        }
    }
}

/// Primitive a helper method implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HelperOp {
    Reverse,
    Splice,
    Swap,
}

impl HelperOp {
    fn classify(body: &str) -> Option<Self> {
        if body.contains(".reverse()") {
            Some(HelperOp::Reverse)
        } else if body.contains(".splice(") {
            Some(HelperOp::Splice)
        } else if body.contains("a[0]=a[") && body.contains("%a.length]") {
            Some(HelperOp::Swap)
        } else {
            None
        }
    }

    fn with_arg(self, arg: usize) -> Instruction {
        match self {
            HelperOp::Reverse => Instruction::Reverse,
            HelperOp::Splice => Instruction::Splice(arg),
            HelperOp::Swap => Instruction::Swap(arg),
        }
    }
}

/// Extraction stage at which a player program stopped matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    /// The player program could not be fetched
    Fetch,
    /// `var <name>=function(a){a=a.split("");...};` not found
    TransformBody,
    /// Helper object literal not found
    HelperObject,
    /// Body or helper methods could not be turned into instructions
    Compile,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionStage::Fetch => "fetch",
            ExtractionStage::TransformBody => "transform body",
            ExtractionStage::HelperObject => "helper object",
            ExtractionStage::Compile => "compile",
        };
        f.write_str(name)
    }
}

/// Why a transform program could not be built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub stage: ExtractionStage,
    pub reason: String,
}

impl ExtractionFailure {
    fn new(stage: ExtractionStage, error: ScanError) -> Self {
        Self {
            stage,
            reason: error.to_string(),
        }
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stage failed: {}", self.stage, self.reason)
    }
}

/// The deciphering logic reconstructed from one player program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformProgram {
    transform_name: String,
    helper_name: String,
    helper_definition: String,
    transform_definition: String,
    instructions: Vec<Instruction>,
}

impl TransformProgram {
    /// Build the program for the transform function `name` in `player_source`
    pub fn build(player_source: &str, name: &str) -> Result<Self, ExtractionFailure> {
        let body = extract_transform_body(player_source, name)
            .map_err(|e| ExtractionFailure::new(ExtractionStage::TransformBody, e))?;
        debug!("Transform body for {}: {} chars", name, body.len());

        let helper_name = helper_name_of(&body)
            .map_err(|e| ExtractionFailure::new(ExtractionStage::HelperObject, e))?;
        let helper_body = extract_helper_object(player_source, &helper_name)
            .map_err(|e| ExtractionFailure::new(ExtractionStage::HelperObject, e))?;
        debug!("Helper object {}: {} chars", helper_name, helper_body.len());

        let instructions = compile(&body, &helper_name, &helper_body)
            .map_err(|e| ExtractionFailure::new(ExtractionStage::Compile, e))?;
        debug!("Compiled {} cipher instructions", instructions.len());

        Ok(Self {
            transform_name: name.to_string(),
            helper_definition: format!("var {} = {{ {} }};", helper_name, helper_body),
            transform_definition: format!(
                "var decipher = function(a) {{ a = a.split(\"\"); {} }};",
                body
            ),
            helper_name,
            instructions,
        })
    }

    /// Name of the transform function in the player program
    pub fn transform_name(&self) -> &str {
        &self.transform_name
    }

    pub fn helper_name(&self) -> &str {
        &self.helper_name
    }

    /// Helper object definition text
    pub fn helper_definition(&self) -> &str {
        &self.helper_definition
    }

    /// `decipher` function definition text
    pub fn transform_definition(&self) -> &str {
        &self.transform_definition
    }

    /// Both definitions, helper first, as one self-contained program text
    pub fn source(&self) -> String {
        format!("{} {}", self.helper_definition, self.transform_definition)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Unscramble a value
    pub fn decipher(&self, scrambled: &str) -> String {
        let mut chars: Vec<char> = scrambled.chars().collect();
        for instruction in &self.instructions {
            instruction.apply(&mut chars);
        }
        chars.into_iter().collect()
    }
}

/// Terminal state of the decipherment engine for one page load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherState {
    /// The player program does not carry the signature anchor
    NoCipher,
    /// A later extraction stage missed
    ExtractionFailed(ExtractionFailure),
    /// The transform program is ready to apply
    Ready(TransformProgram),
}

impl CipherState {
    /// Run the extraction stages over a player program
    pub fn from_player_source(player_source: &str) -> Self {
        let name = match locate_transform_name(player_source) {
            Some(name) => name,
            None => {
                debug!("No signature anchor in player source");
                return CipherState::NoCipher;
            }
        };
        debug!("Found transform function name: {}", name);

        match TransformProgram::build(player_source, &name) {
            Ok(program) => CipherState::Ready(program),
            Err(failure) => {
                warn!("Cipher extraction failed: {}", failure);
                CipherState::ExtractionFailed(failure)
            }
        }
    }

    /// State for a player program that could not be fetched
    pub fn fetch_failed(error: &ScanError) -> Self {
        CipherState::ExtractionFailed(ExtractionFailure {
            stage: ExtractionStage::Fetch,
            reason: error.to_string(),
        })
    }

    pub fn program(&self) -> Option<&TransformProgram> {
        match self {
            CipherState::Ready(program) => Some(program),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.program().is_some()
    }

    /// Resolve a ciphered entry into a playable address
    pub fn resolve(&self, spec: &CipherSpec) -> Result<String, ScanError> {
        match self {
            CipherState::Ready(program) => {
                let signature = program.decipher(&spec.scrambled_value);
                spec.signed_address(&signature)
            }
            CipherState::NoCipher => Err(ScanError::PatternMiss(
                "ciphered stream unavailable: player has no signature anchor".to_string(),
            )),
            CipherState::ExtractionFailed(failure) => Err(ScanError::PatternMiss(format!(
                "ciphered stream unavailable: {}",
                failure
            ))),
        }
    }
}

/// Find the transform function name next to the `"signature"` literal
pub fn locate_transform_name(player_source: &str) -> Option<String> {
    let anchor = Regex::new(&format!(r#""signature",\s?({})\("#, IDENT)).ok()?;
    anchor
        .captures(player_source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_transform_body(player_source: &str, name: &str) -> Result<String, ScanError> {
    let pattern = Regex::new(&format!(
        r#"var {}=function\(a\)\{{a=a\.split\(""\);(.+?)\}};"#,
        regex::escape(name)
    ))?;
    pattern
        .captures(player_source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ScanError::PatternMiss(format!("definition of {}", name)))
}

fn helper_name_of(body: &str) -> Result<String, ScanError> {
    let leading = Regex::new(&format!(r"^\s*({})(?:\.|\[)", IDENT))?;
    leading
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            ScanError::PatternMiss(format!("helper reference in transform body `{}`", body))
        })
}

fn extract_helper_object(player_source: &str, helper: &str) -> Result<String, ScanError> {
    let pattern = Regex::new(&format!(r"(?s)var {}=\{{(.*?)\}};", regex::escape(helper)))?;
    pattern
        .captures(player_source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ScanError::PatternMiss(format!("object literal {}", helper)))
}

fn helper_methods(helper_body: &str) -> Result<HashMap<String, Option<HelperOp>>, ScanError> {
    let method = Regex::new(&format!(
        r#""?({})"?\s*:\s*function\s*\(\s*a\s*(?:,\s*b\s*)?\)\s*\{{([^}}]*)\}}"#,
        IDENT
    ))?;

    let mut methods = HashMap::new();
    for captures in method.captures_iter(helper_body) {
        if let (Some(name), Some(body)) = (captures.get(1), captures.get(2)) {
            methods.insert(name.as_str().to_string(), HelperOp::classify(body.as_str()));
        }
    }
    Ok(methods)
}

fn compile(body: &str, helper: &str, helper_body: &str) -> Result<Vec<Instruction>, ScanError> {
    let methods = helper_methods(helper_body)?;
    if methods.is_empty() {
        return Err(ScanError::PatternMiss(format!("methods of {}", helper)));
    }

    let call = Regex::new(&format!(
        r#"^{}(?:\.({ident})|\["({ident})"\])\(\s*a\s*(?:,\s*(\d+)\s*)?\)$"#,
        regex::escape(helper),
        ident = IDENT
    ))?;
    let ret = Regex::new(r#"^return\s+a\.join\(""\)$"#)?;

    let mut instructions = Vec::new();
    for statement in body.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        if ret.is_match(statement) {
            break;
        }

        let captures = call
            .captures(statement)
            .ok_or_else(|| ScanError::PatternMiss(format!("unsupported statement `{}`", statement)))?;
        let name = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let arg = match captures.get(3) {
            Some(m) => m
                .as_str()
                .parse::<usize>()
                .map_err(|e| ScanError::ParseFailure(format!("argument of {}: {}", name, e)))?,
            None => 0,
        };

        let op = methods
            .get(name)
            .copied()
            .flatten()
            .ok_or_else(|| ScanError::PatternMiss(format!("operation of {}.{}", helper, name)))?;
        instructions.push(op.with_arg(arg));
    }

    if instructions.is_empty() {
        return Err(ScanError::PatternMiss("transform body has no helper calls".to_string()));
    }
    Ok(instructions)
}
