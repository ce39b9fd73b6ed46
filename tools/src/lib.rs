//! Introspection and debugging tools for the deltasync codec.
//!
//! This crate provides utilities for understanding encoded sync payloads:
//!
//! - Lay out a payload's regions from its prefix and the schema's bit counts
//! - Compute the canonical schema string and digest from a JSON description
//!
//! # Design Principles
//!
//! - **First-class tooling** - These tools are part of the product, not afterthoughts.
//! - **Human-readable output** - Make it easy to understand what the codec is doing.

use anyhow::{Context, Result};
use bitstream::{read_prefix, BitBufferReader};
use schema::{canonical_string, schema_digest, DigestMode, Flag, TargetSpec};
use serde::Serialize;
use tracing::debug;

/// Region layout of one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub base_bit: usize,
    /// Byte-region length carried by the prefix.
    pub prefix_value: u64,
    /// Width of the prefix in bytes.
    pub prefix_len: usize,
    pub header_start: usize,
    pub header_bits: usize,
    pub data_bit_start: usize,
    pub data_bits: usize,
    /// First byte of the byte region.
    pub byte_start: usize,
    pub byte_len: usize,
    /// Bytes spanned from the start of the input.
    pub total_len: usize,
    /// Input bytes past the end of the payload.
    pub trailing_bytes: usize,
}

/// Lays out `bytes` as a payload at `base_bit` with the given bit regions.
pub fn inspect_payload(
    bytes: &[u8],
    base_bit: usize,
    header_bits: usize,
    data_bits: usize,
) -> Result<InspectReport> {
    let (prefix_value, prefix_len) = read_prefix(bytes, base_bit).context("read length prefix")?;
    let reader = BitBufferReader::open(bytes, base_bit, header_bits, data_bits)
        .context("payload does not fit the given layout")?;
    let geometry = *reader.geometry();
    debug!(?geometry, "inspected payload");
    Ok(InspectReport {
        base_bit,
        prefix_value,
        prefix_len,
        header_start: geometry.header_start(),
        header_bits,
        data_bit_start: geometry.data_bit_start(),
        data_bits,
        byte_start: geometry.byte_start(),
        byte_len: geometry.byte_len(),
        total_len: geometry.total_len(),
        trailing_bytes: bytes.len() - geometry.total_len(),
    })
}

/// Renders an [`InspectReport`] for humans.
#[must_use]
pub fn format_inspect_pretty(report: &InspectReport) -> String {
    let mut lines = vec![
        format!(
            "prefix: {} ({} byte{}) at bit {}",
            report.prefix_value,
            report.prefix_len,
            if report.prefix_len == 1 { "" } else { "s" },
            report.base_bit
        ),
        format!(
            "header bits: {}..{}",
            report.header_start,
            report.header_start + report.header_bits
        ),
        format!(
            "data bits:   {}..{}",
            report.data_bit_start,
            report.data_bit_start + report.data_bits
        ),
        format!(
            "data bytes:  {}..{} ({} bytes)",
            report.byte_start,
            report.byte_start + report.byte_len,
            report.byte_len
        ),
        format!("total: {} bytes", report.total_len),
    ];
    if report.trailing_bytes > 0 {
        lines.push(format!("trailing: {} bytes", report.trailing_bytes));
    }
    lines.join("\n")
}

/// Canonical string and digest for a schema description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestReport {
    pub mode: &'static str,
    pub canonical: String,
    pub digest: String,
}

/// Parses a JSON list of targets and registers any flag names it uses.
pub fn load_schema_json(text: &str) -> Result<Vec<TargetSpec>> {
    let targets: Vec<TargetSpec> = serde_json::from_str(text).context("parse schema json")?;
    for flag in targets
        .iter()
        .flat_map(|target| &target.fields)
        .flat_map(|field| &field.flags)
    {
        Flag::register(flag).with_context(|| format!("register flag `{flag}`"))?;
    }
    Ok(targets)
}

/// Computes the digest of a JSON schema description.
pub fn digest_from_json(text: &str, mode: DigestMode) -> Result<DigestReport> {
    let targets = load_schema_json(text)?;
    let canonical = canonical_string(&targets, mode).context("invalid schema")?;
    let digest = schema_digest(&targets, mode).context("invalid schema")?;
    Ok(DigestReport {
        mode: match mode {
            DigestMode::Strict => "strict",
            DigestMode::Permissive => "permissive",
        },
        canonical,
        digest: digest.to_hex(),
    })
}
