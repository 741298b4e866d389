use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use tidewatch_core::FeatureId;

pub fn parse_seed(seed: &str) -> Result<u32> {
    let s = seed.trim();
    if s.is_empty() {
        return Err(anyhow!("empty seed"));
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).with_context(|| format!("invalid hex seed: {s}"))
    } else {
        s.parse::<u32>()
            .with_context(|| format!("invalid decimal seed: {s}"))
    }
}

pub fn seed_to_hex(seed: u32) -> String {
    format!("0x{seed:08x}")
}

pub fn parse_seed_csv(input: &str) -> Result<Vec<u32>> {
    let seeds = split_csv(input)
        .map(parse_seed)
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        return Err(anyhow!("no seeds parsed from --seeds"));
    }
    Ok(seeds)
}

pub fn parse_seed_file(path: &Path) -> Result<Vec<u32>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading seed file {}", path.display()))?;
    let mut seeds = Vec::new();
    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        seeds.push(parse_seed(trimmed)?);
    }
    if seeds.is_empty() {
        return Err(anyhow!("seed file {} had no seeds", path.display()));
    }
    Ok(seeds)
}

/// Consecutive seeds starting at `start`, wrapping at `u32::MAX`.
pub fn seed_range(start: u32, count: u32) -> Vec<u32> {
    (0..count).map(|offset| start.wrapping_add(offset)).collect()
}

pub fn parse_feature_csv(input: &str) -> Result<Vec<FeatureId>> {
    let mut features = Vec::new();
    for token in split_csv(input) {
        let id: FeatureId = token
            .parse()
            .with_context(|| format!("invalid feature in --features: {token}"))?;
        if !features.contains(&id) {
            features.push(id);
        }
    }
    if features.is_empty() {
        return Err(anyhow!("--features resolved to empty list"));
    }
    Ok(features)
}

fn split_csv(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
