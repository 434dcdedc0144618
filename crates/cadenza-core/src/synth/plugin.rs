//! Host for externally loaded instrument plugins.
//!
//! The binary interface to the plugin itself lives behind [`PluginLoader`] and
//! [`PluginInstance`]; this engine only schedules note renders in whole processing
//! blocks and carries the persisted parameter values.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use super::{NoteRenderer, Unavailable};
use crate::constants::seconds_to_frames;
use crate::error::{BackendError, ModelError};
use crate::pcm::PcmBuffer;

/// Processing block sizes a host may use, in frames.
pub const BLOCK_SIZES: [u16; 3] = [256, 512, 1024];

/// Default processing block size.
pub const DEFAULT_BLOCK_SIZE: u16 = 1024;

/// One note to be rendered by a plugin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PluginRequest<'a> {
    pub channel: u8,
    pub pitch: u8,
    pub volume: u8,
    pub block_size: u16,
    /// Number of whole blocks to process.
    pub blocks: usize,
    pub parameters: &'a [f32],
}

impl PluginRequest<'_> {
    pub fn frames(&self) -> usize {
        self.blocks * usize::from(self.block_size)
    }
}

/// A loaded plugin.
pub trait PluginInstance: Send + Sync + fmt::Debug {
    fn name(&self) -> String;

    /// Parameter values the plugin starts with, each within 0.0-1.0.
    fn default_parameters(&self) -> Vec<f32>;

    /// Renders a note as stereo audio of `request.frames()` frames.
    fn process(&self, request: &PluginRequest<'_>) -> Result<PcmBuffer, Unavailable>;
}

/// Loads a plugin binary from a path.
pub trait PluginLoader: Send + Sync + fmt::Debug {
    fn load(&self, path: &str) -> Result<Arc<dyn PluginInstance>, BackendError>;
}

/// Plugin host parameters plus the instance loaded for them.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "PluginHostFields", into = "PluginHostFields")]
pub struct PluginHost {
    path: String,
    channel: u8,
    block_size: u16,
    parameters: Vec<f32>,
    instance: Option<Arc<dyn PluginInstance>>,
}

impl Default for PluginHost {
    fn default() -> Self {
        Self {
            path: String::new(),
            channel: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            parameters: Vec::new(),
            instance: None,
        }
    }
}

impl PluginHost {
    pub fn new(
        path: impl Into<String>,
        channel: u8,
        block_size: u16,
        parameters: Vec<f32>,
    ) -> Result<Self, ModelError> {
        for (index, &value) in parameters.iter().enumerate() {
            check_parameter(index, value)?;
        }
        Ok(Self {
            path: path.into(),
            channel: ModelError::check_midi("channel", channel)?,
            block_size: check_block_size(block_size)?,
            parameters,
            instance: None,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn block_size(&self) -> u16 {
        self.block_size
    }

    pub fn parameters(&self) -> &[f32] {
        &self.parameters
    }

    pub fn is_loaded(&self) -> bool {
        self.instance.is_some()
    }

    /// Changes the plugin; the loaded instance and its parameters are dropped.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.parameters.clear();
        self.instance = None;
    }

    pub fn set_channel(&mut self, channel: u8) -> Result<(), ModelError> {
        self.channel = ModelError::check_midi("channel", channel)?;
        Ok(())
    }

    pub fn set_block_size(&mut self, block_size: u16) -> Result<(), ModelError> {
        self.block_size = check_block_size(block_size)?;
        Ok(())
    }

    pub fn set_parameter(&mut self, index: usize, value: f32) -> Result<(), ModelError> {
        let value = check_parameter(index, value)?;
        match self.parameters.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ModelError::InvalidPluginParameter { index, value }),
        }
    }

    /// Loads the plugin for the current path.
    ///
    /// A host with no stored parameters takes the plugin's defaults.
    pub fn attach(&mut self, loader: Option<&dyn PluginLoader>) {
        self.instance = None;
        if self.path.is_empty() {
            return;
        }
        let Some(loader) = loader else {
            return;
        };
        match loader.load(&self.path) {
            Ok(instance) => {
                if self.parameters.is_empty() {
                    self.parameters = instance
                        .default_parameters()
                        .into_iter()
                        .map(|v| v.clamp(0.0, 1.0))
                        .collect();
                }
                self.instance = Some(instance);
            }
            Err(e) => warn!("Failed to load plugin '{}': {}", self.path, e),
        }
    }

    fn file_name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }
}

fn check_block_size(size: u16) -> Result<u16, ModelError> {
    if BLOCK_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(ModelError::InvalidBlockSize { size })
    }
}

fn check_parameter(index: usize, value: f32) -> Result<f32, ModelError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ModelError::InvalidPluginParameter { index, value })
    }
}

impl PartialEq for PluginHost {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.channel == other.channel
            && self.block_size == other.block_size
            && self.parameters == other.parameters
    }
}

impl fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHost")
            .field("path", &self.path)
            .field("channel", &self.channel)
            .field("block_size", &self.block_size)
            .field("parameters", &self.parameters)
            .field("loaded", &self.instance.is_some())
            .finish()
    }
}

impl NoteRenderer for PluginHost {
    fn channel_count(&self) -> u8 {
        2
    }

    fn is_deterministic(&self) -> bool {
        false
    }

    fn render_note(
        &self,
        pitch: u8,
        volume: u8,
        duration_seconds: f64,
    ) -> Result<PcmBuffer, Unavailable> {
        let instance = self
            .instance
            .as_ref()
            .ok_or_else(|| Unavailable::new("no plugin loaded"))?;
        let frames = seconds_to_frames(duration_seconds);
        let blocks = frames.div_ceil(usize::from(self.block_size));
        if blocks == 0 {
            return Ok(PcmBuffer::empty(2));
        }
        instance.process(&PluginRequest {
            channel: self.channel,
            pitch,
            volume,
            block_size: self.block_size,
            blocks,
            parameters: &self.parameters,
        })
    }

    fn describe(&self) -> String {
        match &self.instance {
            Some(instance) => format!("Plugin host. {} ({}).", instance.name(), self.file_name()),
            None => "Plugin host. No plugin loaded.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PluginHostFields {
    #[serde(default)]
    path: String,
    #[serde(default)]
    channel: u8,
    #[serde(default = "default_block_size")]
    block_size: u16,
    #[serde(default)]
    parameters: Vec<f32>,
}

fn default_block_size() -> u16 {
    DEFAULT_BLOCK_SIZE
}

impl TryFrom<PluginHostFields> for PluginHost {
    type Error = ModelError;

    fn try_from(fields: PluginHostFields) -> Result<Self, Self::Error> {
        PluginHost::new(fields.path, fields.channel, fields.block_size, fields.parameters)
    }
}

impl From<PluginHost> for PluginHostFields {
    fn from(host: PluginHost) -> Self {
        Self {
            path: host.path,
            channel: host.channel,
            block_size: host.block_size,
            parameters: host.parameters,
        }
    }
}
