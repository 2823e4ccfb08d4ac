//! Builder that converts a length table and DH rows into a [`Chain`].
//!
//! The entry point is [`ChainBuilder`]. Configure it with a [`ChainConfig`]
//! and call [`ChainBuilder::build_chain`]; [`build_chain`] does the same with
//! the default configuration.

use crate::chain::{
    Chain, DhParameters, Joint, JointType, RowMajorMatrix, Segment, deg_to_rad, frame_from_rows,
};
use crate::error::{ChainError, Result};
use crate::expression::{evaluate, is_identifier, resolve};
use crate::symbols::SymbolScope;
use crate::tables::{DhRow, LengthTable, MILLIMETERS_PER_METER};
use glam::DAffine3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Configuration for chain construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Number of joint variables (`q1 ..= qN`) neutralized in DH expressions.
    pub degrees_of_freedom: usize,
    /// Prefix of joint variable names.
    pub joint_prefix: String,
    /// Value substituted for every joint variable.
    pub joint_placeholder: f64,
    /// Divisor applied to length table values. Default: 1000 (mm to m).
    pub length_divisor: f64,
    /// Joint type given to every DH segment.
    pub joint_type: JointType,
    /// Optional fixed base frame (H0), row-major 4x4.
    pub base_frame: Option<RowMajorMatrix>,
    /// Optional fixed tool frame (HN), row-major 4x4.
    pub tool_frame: Option<RowMajorMatrix>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            degrees_of_freedom: 27,
            joint_prefix: "q".to_string(),
            joint_placeholder: 0.0,
            length_divisor: MILLIMETERS_PER_METER,
            joint_type: JointType::RotZ,
            base_frame: None,
            tool_frame: None,
        }
    }
}

impl ChainConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    /// Parses and validates a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ChainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Checks the divisor, the joint naming and both frames.
    pub fn validate(&self) -> Result<()> {
        if !self.length_divisor.is_finite() || self.length_divisor == 0.0 {
            return Err(ChainError::Config(format!(
                "length_divisor must be finite and non-zero, got {}",
                self.length_divisor
            )));
        }

        if !self.joint_placeholder.is_finite() {
            return Err(ChainError::Config(format!(
                "joint_placeholder must be finite, got {}",
                self.joint_placeholder
            )));
        }

        if !is_identifier(&self.joint_prefix) {
            return Err(ChainError::Config(format!(
                "joint_prefix '{}' is not an identifier",
                self.joint_prefix
            )));
        }

        self.base()?;
        self.tool()?;
        Ok(())
    }

    fn base(&self) -> Result<Option<DAffine3>> {
        rigid_frame(self.base_frame.as_ref(), "base_frame")
    }

    fn tool(&self) -> Result<Option<DAffine3>> {
        rigid_frame(self.tool_frame.as_ref(), "tool_frame")
    }
}

fn rigid_frame(rows: Option<&RowMajorMatrix>, key: &str) -> Result<Option<DAffine3>> {
    rows.map(|rows| {
        frame_from_rows(rows)
            .ok_or_else(|| ChainError::Config(format!("{key} is not a rigid transform")))
    })
    .transpose()
}

/// Builds kinematic chains from DH tables.
#[derive(Debug)]
pub struct ChainBuilder {
    config: ChainConfig,
    joints: SymbolScope,
    base: Option<DAffine3>,
    tool: Option<DAffine3>,
}

impl ChainBuilder {
    /// Creates a builder, validating `config` and preparing the joint placeholders.
    pub fn new(config: ChainConfig) -> Result<Self> {
        config.validate()?;
        let joints = SymbolScope::joint_placeholders(
            &config.joint_prefix,
            config.degrees_of_freedom,
            config.joint_placeholder,
        )?;
        Ok(Self {
            base: config.base()?,
            tool: config.tool()?,
            joints,
            config,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// The joint variable bindings applied to offset and d cells.
    pub fn joint_placeholders(&self) -> &SymbolScope {
        &self.joints
    }

    /// Resolves the four DH parameters of `row`.
    ///
    /// | cell   | symbols substituted   | unit    |
    /// |--------|-----------------------|---------|
    /// | offset | joints                | degrees |
    /// | d      | joints, then lengths  | meters  |
    /// | a      | lengths               | meters  |
    /// | alpha  | none                  | degrees |
    ///
    /// Angles are returned in radians.
    pub fn resolve_row(&self, lengths: &LengthTable, row: &DhRow) -> Result<DhParameters> {
        let joints = &self.joints;
        let lengths = lengths.scope();

        let offset = self.evaluate_cell(row, "offset", &row.offset, &[joints])?;
        let d = self.evaluate_cell(row, "d", &row.d, &[joints, lengths])?;
        let a = self.evaluate_cell(row, "a", &row.a, &[lengths])?;
        let alpha = self.evaluate_cell(row, "alpha", &row.alpha, &[])?;

        info!(
            segment = %row.segment,
            offset,
            d,
            a,
            alpha,
            "resolved dh row"
        );

        Ok(DhParameters::new(
            a,
            deg_to_rad(alpha),
            d,
            deg_to_rad(offset),
        ))
    }

    /// Resolves `row` and appends its segment.
    ///
    /// Nothing is appended if any cell fails; `chain` keeps its previous length.
    pub fn append_row(&self, chain: &mut Chain, lengths: &LengthTable, row: &DhRow) -> Result<()> {
        let params = self.resolve_row(lengths, row)?;
        chain.add_segment(Segment::from_dh(
            row.segment.clone(),
            Joint::new(self.config.joint_type),
            params,
        ));
        Ok(())
    }

    /// Builds the chain for `rows` in order, bracketed by the configured base
    /// and tool frames. The first failing row aborts the build.
    pub fn build_chain(&self, lengths: &LengthTable, rows: &[DhRow]) -> Result<Chain> {
        let mut chain = Chain::new();

        if let Some(base) = self.base {
            chain.add_segment(Segment::new("H0", Joint::fixed(), base));
        }

        for row in rows {
            debug!(segment = %row.segment, line = row.line, ?row, "row");
            self.append_row(&mut chain, lengths, row)?;
        }

        if let Some(tool) = self.tool {
            chain.add_segment(Segment::new("HN", Joint::fixed(), tool));
        }

        info!(
            segments = chain.segment_count(),
            joints = chain.joint_count(),
            "chain built"
        );
        Ok(chain)
    }

    fn evaluate_cell(
        &self,
        row: &DhRow,
        parameter: &'static str,
        expression: &str,
        scopes: &[&SymbolScope],
    ) -> Result<f64> {
        let fail = |source| ChainError::evaluation(&row.segment, parameter, expression, source);
        let resolved = resolve(expression, scopes).map_err(fail)?;
        let value = evaluate(&resolved).map_err(fail)?;
        debug!(segment = %row.segment, parameter, expression, %resolved, value, "cell");
        Ok(value)
    }
}

/// Builds a chain with the default configuration.
pub fn build_chain(lengths: &LengthTable, rows: &[DhRow]) -> Result<Chain> {
    ChainBuilder::new(ChainConfig::default())?.build_chain(lengths, rows)
}
