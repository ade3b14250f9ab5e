//! Resolution of the protobuf schemas embedded in a record.
//!
//! Every channel carries a `ProtoDesc`: the serialized `FileDescriptorProto`
//! declaring its message type plus, recursively, the descriptors of every file
//! it imports. Resolution runs in two phases:
//!
//! 1. build: [`SchemaRegistryBuilder::register`] walks each `ProtoDesc` with an
//!    explicit stack and adds files dependencies first, so a file is only
//!    materialized once everything it imports is known.
//! 2. lookup: [`SchemaRegistryBuilder::build`] freezes the registry into a
//!    read-only [`SchemaRegistry`] keyed by full message name, from which
//!    [`DecoderMap`] resolves one [`MessageDecoder`] per channel.
//!
//! Any failure surfaces while the record is opened, never while messages are read.

use std::collections::{HashMap, HashSet};

use protobuf::descriptor::FileDescriptorProto;
use protobuf::reflect::{FileDescriptor, MessageDescriptor};
use protobuf::{Message, MessageDyn};
use tracing::{debug, warn};

use crate::error::{RecordError, Result};
use crate::index::ChannelMetadata;
use crate::proto::proto_desc::ProtoDesc;

enum Visit<'a> {
    /// Parse the file of this descriptor and schedule its dependencies.
    Enter(&'a ProtoDesc),
    /// All dependencies are registered, the file itself can be added.
    Exit(FileDescriptorProto),
}

/// SchemaRegistryBuilder collects file descriptors during the build phase.
#[derive(Default)]
pub struct SchemaRegistryBuilder {
    files: HashMap<String, FileDescriptor>,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// register adds the file described by `root` and, before it, all of its
    /// dependencies. Files registered earlier (by this or another channel) are
    /// reused. `channel` only names the culprit in errors.
    pub fn register(&mut self, channel: &str, root: &ProtoDesc) -> Result<()> {
        let mut stack = vec![Visit::Enter(root)];
        // files entered but not yet registered: the current dependency path
        let mut path: HashSet<String> = HashSet::new();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(desc) => {
                    let file = FileDescriptorProto::parse_from_bytes(desc.desc()).map_err(|e| {
                        RecordError::schema(channel, format!("malformed file descriptor: {}", e))
                    })?;
                    let name = file.name().to_string();

                    if path.contains(&name) {
                        return Err(RecordError::schema(
                            channel,
                            format!("dependency cycle through {}", name),
                        ));
                    }

                    if let Some(existing) = self.files.get(&name) {
                        if existing.proto() != &file {
                            warn!(
                                "channel {} embeds a different definition of {}, keeping the first one",
                                channel, name
                            );
                        }
                        continue;
                    }

                    path.insert(name);
                    stack.push(Visit::Exit(file));
                    for dependency in desc.dependencies.iter().rev() {
                        stack.push(Visit::Enter(dependency));
                    }
                }
                Visit::Exit(file) => {
                    let name = file.name().to_string();
                    path.remove(&name);
                    self.add_file(channel, name, file)?;
                }
            }
        }

        Ok(())
    }

    fn add_file(&mut self, channel: &str, name: String, file: FileDescriptorProto) -> Result<()> {
        let mut deps = Vec::with_capacity(file.dependency.len());
        for dependency in &file.dependency {
            match self.files.get(dependency) {
                Some(fd) => deps.push(fd.clone()),
                None => {
                    return Err(RecordError::schema(
                        channel,
                        format!("{} imports {} which is not embedded", name, dependency),
                    ))
                }
            }
        }

        let fd = FileDescriptor::new_dynamic(file, &deps).map_err(|e| {
            RecordError::schema(channel, format!("invalid file descriptor {}: {}", name, e))
        })?;

        debug!("registered schema file {} ({} dependencies)", name, deps.len());
        self.files.insert(name, fd);
        Ok(())
    }

    /// build ends the build phase.
    pub fn build(self) -> SchemaRegistry {
        let mut types = HashMap::new();

        for fd in self.files.values() {
            let mut pending: Vec<MessageDescriptor> = fd.messages().collect();
            while let Some(md) = pending.pop() {
                pending.extend(md.nested_messages());
                types.insert(md.full_name().to_string(), md);
            }
        }

        SchemaRegistry {
            files: self.files,
            types,
        }
    }
}

/// SchemaRegistry is the frozen, read-only set of message types known to a reader.
pub struct SchemaRegistry {
    files: HashMap<String, FileDescriptor>,
    /// Full message name (`package.Message`, no leading dot) to descriptor.
    types: HashMap<String, MessageDescriptor>,
}

impl SchemaRegistry {
    pub fn find_message(&self, full_name: &str) -> Option<&MessageDescriptor> {
        self.types.get(full_name.trim_start_matches('.'))
    }

    pub fn contains_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

/// MessageDecoder turns the payload of one channel into a dynamic message.
#[derive(Clone)]
pub struct MessageDecoder {
    descriptor: MessageDescriptor,
}

impl MessageDecoder {
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn message_type(&self) -> &str {
        self.descriptor.full_name()
    }

    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    pub fn decode(&self, payload: &[u8]) -> protobuf::Result<Box<dyn MessageDyn>> {
        self.descriptor.parse_from_bytes(payload)
    }
}

/// DecoderMap resolves every channel of a record to its decoder.
pub struct DecoderMap {
    registry: SchemaRegistry,
    decoders: HashMap<String, MessageDecoder>,
}

impl DecoderMap {
    /// build registers the schemas of all channels, then resolves each
    /// channel's message type. A channel whose type cannot be resolved fails
    /// the whole build.
    pub fn build<'a, I>(channels: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ChannelMetadata>,
    {
        let channels: Vec<&ChannelMetadata> = channels.into_iter().collect();

        let mut builder = SchemaRegistryBuilder::new();
        for channel in &channels {
            let proto_desc = ProtoDesc::parse_from_bytes(channel.proto_desc.as_slice())
                .map_err(|e| RecordError::schema(&channel.name, format!("malformed proto desc: {}", e)))?;
            builder.register(&channel.name, &proto_desc)?;
        }
        let registry = builder.build();

        let mut decoders = HashMap::with_capacity(channels.len());
        for channel in &channels {
            let descriptor = registry.find_message(&channel.message_type).ok_or_else(|| {
                RecordError::schema(
                    &channel.name,
                    format!("message type {} not found", channel.message_type),
                )
            })?;
            decoders.insert(channel.name.clone(), MessageDecoder::new(descriptor.clone()));
        }

        debug!(
            "resolved {} channels from {} schema files",
            decoders.len(),
            registry.file_count()
        );
        Ok(Self { registry, decoders })
    }

    pub fn get(&self, channel_name: &str) -> Option<&MessageDecoder> {
        self.decoders.get(channel_name)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }
}
