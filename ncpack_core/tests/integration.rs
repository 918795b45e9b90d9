/// Integration tests for the NCPK1 container: a store written with `Writer`
/// reads back through `Reader` with identical structure and values, chunked
/// and compressed variables included.
use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;

use ncpack_codecs::{DeflateCodec, Lz4Codec, PassThroughCodec, ZstdCodec};
use ncpack_core::{
    peek_codec_id, ArrayData, AttrValue, Codec, DataType, Reader, StoreRead, StoreWrite,
    VariableSpec, Writer,
};

/// Deterministic field of `len` values with a short period along x.
fn field(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i % 8) as f32 * 0.5 + 280.0).collect()
}

/// A small climate-style store: coordinates, a chunked compressed field and
/// an unlimited time axis.
fn write_sample(path: &std::path::Path, codec: Box<dyn Codec>) -> u64 {
    let mut w = Writer::create(path, codec).unwrap();
    w.set_global_attribute("title", AttrValue::from("sample")).unwrap();
    w.set_global_attribute("version", AttrValue::from(3i32)).unwrap();
    w.add_dimension("time", None).unwrap();
    w.add_dimension("lat", Some(6)).unwrap();
    w.add_dimension("lon", Some(8)).unwrap();

    let mut lat = w
        .add_variable(VariableSpec::new("lat", DataType::F64, &["lat"]))
        .unwrap();
    lat.set_attribute("units", "degrees_north").unwrap();
    lat.put_values(ArrayData::F64((0..6).map(|i| -50.0 + 20.0 * i as f64).collect()))
        .unwrap();

    let mut tas = w
        .add_variable(
            VariableSpec::new("tas", DataType::F32, &["time", "lat", "lon"])
                .chunked(vec![1, 6, 8])
                .compressed(9),
        )
        .unwrap();
    tas.set_attribute("units", "K").unwrap();
    tas.put_values(ArrayData::F32(field(4 * 6 * 8))).unwrap();

    w.finish().unwrap()
}

#[test]
fn test_roundtrip_structure_and_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.ncpk");
    let chunks = write_sample(&path, Box::new(DeflateCodec));
    // one raw chunk for lat + one per time step for tas
    assert_eq!(chunks, 1 + 4);

    let mut r = Reader::open(&path, Arc::new(DeflateCodec)).unwrap();
    assert_eq!(r.global_attributes().get("title").unwrap().as_text(), Some("sample"));
    let names: Vec<&str> = r.global_attributes().names().collect();
    assert_eq!(names, vec!["title", "version"]);

    let time = r.dimension("time").unwrap();
    assert!(time.unlimited);
    assert_eq!(time.len, 4);
    assert_eq!(r.dimension("lon").unwrap().len, 8);

    let tas = r.variable("tas").unwrap().clone();
    assert_eq!(tas.chunk_shape, Some(vec![1, 6, 8]));
    assert_eq!(tas.compression_level, Some(9));
    assert_eq!(r.read_values("tas").unwrap(), ArrayData::F32(field(4 * 6 * 8)));
    assert_eq!(r.read_values("lat").unwrap().get_f64(5), Some(50.0));
}

#[test]
fn test_every_codec_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let codecs: Vec<(Box<dyn Codec>, Arc<dyn Codec>)> = vec![
        (Box::new(PassThroughCodec), Arc::new(PassThroughCodec)),
        (Box::new(ZstdCodec), Arc::new(ZstdCodec)),
        (Box::new(Lz4Codec), Arc::new(Lz4Codec)),
    ];
    for (i, (w_codec, r_codec)) in codecs.into_iter().enumerate() {
        let path = dir.path().join(format!("codec_{i}.ncpk"));
        write_sample(&path, w_codec);
        assert_eq!(peek_codec_id(&path).unwrap(), r_codec.id());
        let mut r = Reader::open(&path, r_codec).unwrap();
        assert_eq!(r.read_values("tas").unwrap(), ArrayData::F32(field(4 * 6 * 8)));
    }
}

#[test]
fn test_compressed_field_is_smaller() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ratio.ncpk");
    write_sample(&path, Box::new(DeflateCodec));
    let r = Reader::open(&path, Arc::new(DeflateCodec)).unwrap();
    let (raw, stored) = r.variable_sizes("tas");
    assert_eq!(raw, 4 * 6 * 8 * 4);
    assert!(stored < raw, "deflate should shrink a periodic field: {stored} >= {raw}");
    assert!(r.ratio() > 1.0);
}

#[test]
fn test_codec_mismatch_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mismatch.ncpk");
    write_sample(&path, Box::new(ZstdCodec));

    let result = Reader::open(&path, Arc::new(Lz4Codec));
    let err = result.err().unwrap().to_string();
    assert!(err.contains("codec mismatch"), "got: {err}");
}

#[test]
fn test_corrupted_chunk_fails_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.ncpk");
    write_sample(&path, Box::new(DeflateCodec));

    let offset = {
        let r = Reader::open(&path, Arc::new(DeflateCodec)).unwrap();
        let layout = r.layout("tas").unwrap().clone();
        r.entries()[layout.first_chunk as usize].offset
    };
    let mut f = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    f.seek(SeekFrom::Start(offset + 2)).unwrap();
    f.write_all(&[0xFF, 0x00, 0xFF]).unwrap();
    drop(f);

    let mut r = Reader::open(&path, Arc::new(DeflateCodec)).unwrap();
    let err = r.read_values("tas").unwrap_err().to_string();
    assert!(err.contains("checksum mismatch"), "got: {err}");
    // other variables are untouched
    assert!(r.read_values("lat").is_ok());
}

/// Overwrite 8 bytes at `offset` (negative counts from the end).
fn patch_u64(path: &std::path::Path, offset: i64, value: u64) {
    let mut f = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    let pos = if offset < 0 { SeekFrom::End(offset) } else { SeekFrom::Start(offset as u64) };
    f.seek(pos).unwrap();
    f.write_all(&value.to_le_bytes()).unwrap();
}

#[test]
fn test_oversized_chunk_count_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("count.ncpk");
    write_sample(&path, Box::new(ZstdCodec));
    // header chunk_count field
    patch_u64(&path, 30, u64::MAX / 4);

    let err = Reader::open(&path, Arc::new(ZstdCodec)).err().unwrap().to_string();
    assert!(err.contains("chunk index"), "got: {err}");
}

#[test]
fn test_oversized_metadata_len_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.ncpk");
    write_sample(&path, Box::new(ZstdCodec));
    // footer metadata_len field
    patch_u64(&path, -8, 1 << 40);

    let err = Reader::open(&path, Arc::new(ZstdCodec)).err().unwrap().to_string();
    assert!(err.contains("metadata section"), "got: {err}");

    patch_u64(&path, -8, u64::MAX);
    assert!(Reader::open(&path, Arc::new(ZstdCodec)).is_err());
}

#[test]
fn test_not_an_ncpk_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.txt");
    std::fs::write(&path, vec![b'x'; 128]).unwrap();
    let err = Reader::open(&path, Arc::new(DeflateCodec)).err().unwrap().to_string();
    assert!(err.contains("magic"), "got: {err}");
}

#[test]
fn test_packed_variable_decodes_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("packed.ncpk");

    let mut w = Writer::create(&path, Box::new(DeflateCodec)).unwrap();
    w.add_dimension("y", Some(2)).unwrap();
    w.add_dimension("x", Some(3)).unwrap();
    let mut v = w
        .add_variable(
            VariableSpec::new("pr", DataType::U16, &["y", "x"])
                .chunked(vec![2, 3])
                .compressed(9)
                .fill_value(ArrayData::U16(vec![u16::MAX])),
        )
        .unwrap();
    v.set_attribute("scale_factor", 0.5f64).unwrap();
    v.set_attribute("add_offset", 1.0f64).unwrap();
    v.set_auto_mask_and_scale(true).unwrap();
    v.put_values(ArrayData::F32(vec![1.0, 1.5, 2.0, f32::NAN, 3.0, 3.5]))
        .unwrap();
    w.finish().unwrap();

    let mut r = Reader::open(&path, Arc::new(DeflateCodec)).unwrap();
    assert_eq!(
        r.read_values("pr").unwrap(),
        ArrayData::U16(vec![0, 1, 2, u16::MAX, 4, 5])
    );
    let decoded = r.read_unpacked("pr").unwrap();
    assert_eq!(decoded[2], 2.0);
    assert!(decoded[3].is_nan());
    assert_eq!(decoded[5], 3.5);
}

#[test]
fn test_declared_but_unwritten_variable_reads_as_fill() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unwritten.ncpk");

    let mut w = Writer::create(&path, Box::new(PassThroughCodec)).unwrap();
    w.add_dimension("x", Some(3)).unwrap();
    w.define_variable(
        VariableSpec::new("empty", DataType::I32, &["x"]).fill_value(ArrayData::I32(vec![-9])),
    )
    .unwrap();
    w.finish().unwrap();

    let mut r = Reader::open(&path, Arc::new(PassThroughCodec)).unwrap();
    assert_eq!(r.read_values("empty").unwrap(), ArrayData::I32(vec![-9, -9, -9]));
}
