#![allow(dead_code)]

use std::path::{Path, PathBuf};

use cyber_record::proto::proto_desc::ProtoDesc;
use cyber_record::proto::record::{
    Channel, ChannelCache, ChunkBody, ChunkBodyCache, ChunkHeader, ChunkHeaderCache, Header,
    Index, SectionType as WireType, SingleIndex, SingleMessage,
};
use cyber_record::section::{Section, SectionType, FIRST_CHUNK_OFFSET, HEADER_LENGTH, SECTION_LENGTH};
use protobuf::descriptor::field_descriptor_proto::{Label, Type};
use protobuf::descriptor::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use protobuf::reflect::{FileDescriptor, MessageDescriptor, ReflectValueBox};
use protobuf::{EnumOrUnknown, Message};

pub const POSE_TYPE: &str = "demo.sensor.Pose";
pub const IMU_TYPE: &str = "demo.sensor.Imu";

fn field(name: &str, number: i32, typ: Type, type_name: Option<&str>) -> FieldDescriptorProto {
    let mut f = FieldDescriptorProto::new();
    f.set_name(name.to_string());
    f.set_number(number);
    f.set_label(Label::LABEL_OPTIONAL);
    f.set_type(typ);
    if let Some(type_name) = type_name {
        f.set_type_name(type_name.to_string());
    }
    f
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    let mut m = DescriptorProto::new();
    m.set_name(name.to_string());
    m.field = fields;
    m
}

fn file(
    name: &str,
    package: &str,
    dependencies: &[&str],
    messages: Vec<DescriptorProto>,
) -> FileDescriptorProto {
    let mut f = FileDescriptorProto::new();
    f.set_name(name.to_string());
    f.set_package(package.to_string());
    f.set_syntax("proto2".to_string());
    f.dependency = dependencies.iter().map(|d| d.to_string()).collect();
    f.message_type = messages;
    f
}

/// Sensor is the schema shared by the generated records: `demo/sensor.proto`
/// declares `Pose` and `Imu` and imports `demo/header.proto`.
pub struct Sensor {
    header_file: FileDescriptorProto,
    sensor_file: FileDescriptorProto,
    pub pose: MessageDescriptor,
    pub imu: MessageDescriptor,
}

impl Sensor {
    pub fn new() -> Self {
        let header_file = file(
            "demo/header.proto",
            "demo.common",
            &[],
            vec![message(
                "Header",
                vec![
                    field("timestamp_sec", 1, Type::TYPE_DOUBLE, None),
                    field("frame_id", 2, Type::TYPE_STRING, None),
                ],
            )],
        );
        let sensor_file = file(
            "demo/sensor.proto",
            "demo.sensor",
            &["demo/header.proto"],
            vec![
                message(
                    "Pose",
                    vec![
                        field("header", 1, Type::TYPE_MESSAGE, Some(".demo.common.Header")),
                        field("x", 2, Type::TYPE_DOUBLE, None),
                        field("y", 3, Type::TYPE_DOUBLE, None),
                    ],
                ),
                message(
                    "Imu",
                    vec![
                        field("header", 1, Type::TYPE_MESSAGE, Some(".demo.common.Header")),
                        field("yaw", 2, Type::TYPE_DOUBLE, None),
                    ],
                ),
            ],
        );

        let header_fd = FileDescriptor::new_dynamic(header_file.clone(), &[]).unwrap();
        let sensor_fd = FileDescriptor::new_dynamic(sensor_file.clone(), &[header_fd]).unwrap();
        let find = |name: &str| {
            sensor_fd
                .messages()
                .find(|m| m.name() == name)
                .unwrap()
        };
        let pose = find("Pose");
        let imu = find("Imu");

        Self {
            header_file,
            sensor_file,
            pose,
            imu,
        }
    }

    /// proto_desc returns the serialized descriptor tree a channel carries.
    pub fn proto_desc(&self) -> Vec<u8> {
        let mut header = ProtoDesc::new();
        header.set_desc(self.header_file.write_to_bytes().unwrap());

        let mut root = ProtoDesc::new();
        root.set_desc(self.sensor_file.write_to_bytes().unwrap());
        root.dependencies.push(header);
        root.write_to_bytes().unwrap()
    }

    pub fn pose_payload(&self, x: f64, y: f64) -> Vec<u8> {
        let mut m = self.pose.new_instance();
        self.pose
            .field_by_name("x")
            .unwrap()
            .set_singular_field(&mut *m, ReflectValueBox::F64(x));
        self.pose
            .field_by_name("y")
            .unwrap()
            .set_singular_field(&mut *m, ReflectValueBox::F64(y));
        m.write_to_bytes_dyn().unwrap()
    }

    pub fn imu_payload(&self, yaw: f64) -> Vec<u8> {
        let mut m = self.imu.new_instance();
        self.imu
            .field_by_name("yaw")
            .unwrap()
            .set_singular_field(&mut *m, ReflectValueBox::F64(yaw));
        m.write_to_bytes_dyn().unwrap()
    }
}

pub fn single_message(channel_name: &str, time: u64, content: Vec<u8>) -> SingleMessage {
    let mut m = SingleMessage::new();
    m.set_channel_name(channel_name.to_string());
    m.set_time(time);
    m.set_content(content);
    m
}

/// IndexPlacement controls what the header's index position points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPlacement {
    Written,
    /// No index block; the header points at offset 0 like an unfinished record.
    Missing,
    /// An index block exists but the header points at the first chunk header.
    Misplaced,
    /// An index block exists but the header points at an arbitrary offset.
    At(u64),
}

/// RecordBuilder lays out a record file the way a producer writes it:
/// header region, channel sections, chunk header and body pairs, then the
/// index block.
pub struct RecordBuilder {
    channels: Vec<Channel>,
    chunks: Vec<Vec<SingleMessage>>,
    placement: IndexPlacement,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self {
            channels: vec![],
            chunks: vec![],
            placement: IndexPlacement::Written,
        }
    }

    pub fn channel(mut self, name: &str, message_type: &str, proto_desc: Vec<u8>) -> Self {
        let mut channel = Channel::new();
        channel.set_name(name.to_string());
        channel.set_message_type(message_type.to_string());
        channel.set_proto_desc(proto_desc);
        self.channels.push(channel);
        self
    }

    pub fn chunk(mut self, messages: Vec<SingleMessage>) -> Self {
        self.chunks.push(messages);
        self
    }

    pub fn index(mut self, placement: IndexPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![0u8; FIRST_CHUNK_OFFSET as usize];
        let mut index = Index::new();

        let mut begin_time = u64::MAX;
        let mut end_time = 0;
        let mut message_number = 0;
        let mut first_chunk_position = None;

        for channel in &self.channels {
            let position = write_section(&mut buf, SectionType::Channel, channel);

            let mut cache = ChannelCache::new();
            cache.set_name(channel.name().to_string());
            cache.set_message_type(channel.message_type().to_string());
            cache.set_proto_desc(channel.proto_desc().to_vec());
            cache.set_message_number(
                self.chunks
                    .iter()
                    .flatten()
                    .filter(|m| m.channel_name() == channel.name())
                    .count() as u64,
            );

            let mut entry = single_index(WireType::SECTION_CHANNEL, position);
            entry.set_channel_cache(cache);
            index.indexes.push(entry);
        }

        for messages in &self.chunks {
            let chunk_begin = messages.iter().map(|m| m.time()).min().unwrap_or(0);
            let chunk_end = messages.iter().map(|m| m.time()).max().unwrap_or(0);
            begin_time = begin_time.min(chunk_begin);
            end_time = end_time.max(chunk_end);
            message_number += messages.len() as u64;

            let mut chunk_header = ChunkHeader::new();
            chunk_header.set_begin_time(chunk_begin);
            chunk_header.set_end_time(chunk_end);
            chunk_header.set_message_number(messages.len() as u64);
            let position = write_section(&mut buf, SectionType::ChunkHeader, &chunk_header);
            first_chunk_position.get_or_insert(position);

            let mut cache = ChunkHeaderCache::new();
            cache.set_begin_time(chunk_begin);
            cache.set_end_time(chunk_end);
            cache.set_message_number(messages.len() as u64);
            let mut entry = single_index(WireType::SECTION_CHUNK_HEADER, position);
            entry.set_chunk_header_cache(cache);
            index.indexes.push(entry);

            let mut body = ChunkBody::new();
            body.messages = messages.clone();
            let position = write_section(&mut buf, SectionType::ChunkBody, &body);

            let mut cache = ChunkBodyCache::new();
            cache.set_message_number(messages.len() as u64);
            let mut entry = single_index(WireType::SECTION_CHUNK_BODY, position);
            entry.set_chunk_body_cache(cache);
            index.indexes.push(entry);
        }

        let index_position = match self.placement {
            IndexPlacement::Written => write_section(&mut buf, SectionType::Index, &index),
            IndexPlacement::Missing => 0,
            IndexPlacement::Misplaced => {
                write_section(&mut buf, SectionType::Index, &index);
                first_chunk_position.unwrap_or(FIRST_CHUNK_OFFSET)
            }
            IndexPlacement::At(position) => {
                write_section(&mut buf, SectionType::Index, &index);
                position
            }
        };

        let mut header = Header::new();
        header.set_major_version(1);
        header.set_minor_version(0);
        header.set_chunk_interval(20_000_000_000);
        header.set_segment_interval(60_000_000_000);
        header.set_index_position(index_position);
        header.set_chunk_number(self.chunks.len() as u64);
        header.set_channel_number(self.channels.len() as u64);
        header.set_begin_time(if message_number == 0 { 0 } else { begin_time });
        header.set_end_time(end_time);
        header.set_message_number(message_number);
        header.set_size(buf.len() as u64);
        header.set_is_complete(self.placement != IndexPlacement::Missing);

        let payload = header.write_to_bytes().unwrap();
        assert!(payload.len() as u64 <= HEADER_LENGTH);
        let mut prologue = Vec::with_capacity(SECTION_LENGTH as usize);
        Section::new(SectionType::Header, payload.len() as u64)
            .write_to(&mut prologue)
            .unwrap();
        buf[..prologue.len()].copy_from_slice(&prologue);
        buf[prologue.len()..prologue.len() + payload.len()].copy_from_slice(&payload);

        buf
    }

    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join("demo.record");
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

fn single_index(typ: WireType, position: u64) -> SingleIndex {
    let mut entry = SingleIndex::new();
    entry.type_ = Some(EnumOrUnknown::new(typ));
    entry.set_position(position);
    entry
}

/// write_section appends a section and returns the offset of its prologue.
fn write_section<M: Message>(buf: &mut Vec<u8>, typ: SectionType, m: &M) -> u64 {
    let position = buf.len() as u64;
    let payload = m.write_to_bytes().unwrap();
    Section::new(typ, payload.len() as u64).write_to(buf).unwrap();
    buf.extend_from_slice(&payload);
    position
}

/// demo_record has a `/pose` and an `/imu` channel and one chunk spanning
/// [1000, 2000] with three poses and two imu readings interleaved.
pub fn demo_record(sensor: &Sensor) -> RecordBuilder {
    RecordBuilder::new()
        .channel("/pose", POSE_TYPE, sensor.proto_desc())
        .channel("/imu", IMU_TYPE, sensor.proto_desc())
        .chunk(vec![
            single_message("/pose", 1000, sensor.pose_payload(1.0, 2.0)),
            single_message("/imu", 1200, sensor.imu_payload(0.1)),
            single_message("/pose", 1500, sensor.pose_payload(3.0, 4.0)),
            single_message("/imu", 1700, sensor.imu_payload(0.2)),
            single_message("/pose", 2000, sensor.pose_payload(5.0, 6.0)),
        ])
}
