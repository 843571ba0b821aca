//! Integration tests for nitf-rs crates.
//!
//! This crate contains end-to-end tests that exercise the field store, the
//! TRE interpreter and the record container together, including round trips
//! through files on disk.

#[cfg(test)]
mod tests {
    use nitf_core::FieldKind;
    use nitf_record::io::{BufferSource, ReadOptions};
    use nitf_record::planner::{plan_segments, PlanParams, SegmentPlan};
    use nitf_record::{Record, SegmentKind};
    use nitf_tre::{Count, DescriptorTable, Extensions, Tre, TreCatalog};
    use tempfile::tempdir;

    fn engrda(catalog: &TreCatalog) -> Tre {
        let mut tre = catalog.create("ENGRDA").unwrap();
        tre.set_field("RESRC", "IMU").unwrap();
        tre.set_field("RECNT", &1u8).unwrap();
        tre.set_field("ENGLN[0]", &5u8).unwrap();
        tre.set_field("ENGLBL[0]", "PITCH").unwrap();
        tre.set_field("ENGDTS[0]", &2u8).unwrap();
        tre.set_field("ENGDATC[0]", &2u8).unwrap();
        tre.set_raw_field("ENGDATA[0]", &[0, 1, 0, 2]).unwrap();
        tre
    }

    /// Planned image segments written to disk and read back.
    #[test]
    fn test_planned_image_file_roundtrip() {
        let catalog = TreCatalog::with_builtins();
        let params = PlanParams::new(300, 40, 1).with_max_bytes(5000);
        let plan = plan_segments(&params).unwrap();
        assert_eq!(plan.segments.len(), 3);

        let mut record = Record::new().unwrap();
        let mut source = BufferSource::new();
        record.set_header_field("FTITLE", "planned").unwrap();
        for seg in &plan.segments {
            let i = record.new_segment(SegmentKind::Image, None).unwrap();
            let image = record.segment_mut(SegmentKind::Image, i).unwrap();
            let sub = image.subheader_mut();
            sub.set_field("NROWS", &seg.num_rows).unwrap();
            sub.set_field("NCOLS", &40u32).unwrap();
            sub.set_field("ILOC", seg.iloc().as_str()).unwrap();
            if i > 0 {
                sub.set_field("IALVL", &i).unwrap();
            }
            let bytes = (seg.num_rows * 40) as u64;
            image.set_data_length(bytes).unwrap();
            image.extended_mut().unwrap().append(engrda(&catalog));
            source.insert(SegmentKind::Image, i, vec![i as u8; bytes as usize]);
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join("planned.ntf");
        let written = record.save(&path, &mut source).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), written);

        let back = Record::open(&path, &catalog, &ReadOptions::default()).unwrap();
        assert_eq!(back.header().get_field("FTITLE").unwrap().trimmed().unwrap(), "planned");
        assert_eq!(back.count(SegmentKind::Image), 3);

        let mut file = std::io::BufReader::new(std::fs::File::open(&path).unwrap());
        for (i, seg) in plan.segments.iter().enumerate() {
            let image = back.segment(SegmentKind::Image, i).unwrap();
            assert_eq!(image.subheader().get::<usize>("NROWS").unwrap(), seg.num_rows);
            assert_eq!(image.subheader().get::<String>("ILOC").unwrap(), seg.iloc());

            let ext = image.extended().first("ENGRDA").unwrap();
            assert!(!ext.is_opaque());
            assert_eq!(ext.get::<String>("ENGLBL[0]").unwrap(), "PITCH");
            assert_eq!(ext.get_field("ENGDATA[0]").unwrap().raw(), &[0, 1, 0, 2]);

            let data = back.read_segment_data(&mut file, SegmentKind::Image, i).unwrap();
            assert_eq!(data.len(), seg.num_rows * 40);
            assert!(data.iter().all(|&b| b == i as u8));
        }
    }

    /// Every segment kind, plus header extensions, survives a round trip.
    #[test]
    fn test_all_kinds_roundtrip() {
        let catalog = TreCatalog::with_builtins();
        let mut record = Record::new().unwrap();
        let mut source = BufferSource::new();

        for (n, kind) in SegmentKind::ALL.iter().enumerate() {
            for _ in 0..=n % 2 {
                let i = record.new_segment(*kind, None).unwrap();
                let data = format!("{}-{}", kind.marker(), i).into_bytes();
                record
                    .segment_mut(*kind, i)
                    .unwrap()
                    .set_data_length(data.len() as u64)
                    .unwrap();
                source.insert(*kind, i, data);
            }
        }
        let mut comment = catalog.create("JITCID").unwrap();
        comment.set_raw_field("FILCMT", b"integration").unwrap();
        record.user_defined_mut().append(comment);
        record.extended_mut().append(Tre::opaque("ZZZZZZ", b"\x00\x01\x02"));

        let dir = tempdir().unwrap();
        let path = dir.path().join("kinds.ntf");
        record.save(&path, &mut source).unwrap();
        let back = Record::open(&path, &catalog, &ReadOptions::default()).unwrap();

        assert_eq!(back.header().to_bytes().unwrap(), record.header().to_bytes().unwrap());
        for kind in SegmentKind::ALL {
            assert_eq!(back.count(kind), record.count(kind));
            assert_eq!(back.header_count(kind).unwrap(), back.count(kind));
            for (a, b) in back.segments(kind).iter().zip(record.segments(kind)) {
                assert_eq!(a.subheader().to_bytes().unwrap(), b.subheader().to_bytes().unwrap());
                assert_eq!(a.data_offset(), b.data_offset());
                assert_eq!(a.data_length(), b.data_length());
            }
        }
        let comment = back.user_defined().first("JITCID").unwrap();
        assert_eq!(comment.get::<String>("FILCMT").unwrap(), "integration");
        let blob = back.extended().first("ZZZZZZ").unwrap();
        assert_eq!(blob.raw_data(), Some(&[0u8, 1, 2][..]));
    }

    /// A known tag with a body that does not fit its table.
    #[test]
    fn test_malformed_extension_strictness() {
        let catalog = TreCatalog::with_builtins();
        let mut record = Record::new().unwrap();
        record.new_segment(SegmentKind::Text, None).unwrap();
        record
            .segment_mut(SegmentKind::Text, 0)
            .unwrap()
            .extended_mut()
            .unwrap()
            .append(Tre::opaque("ENGRDA", b"too short"));

        let mut bytes = Vec::new();
        record.write_to(&mut bytes, &mut BufferSource::new()).unwrap();

        let lenient = Record::read_from(
            &mut std::io::Cursor::new(&bytes),
            &catalog,
            &ReadOptions::default(),
        )
        .unwrap();
        let kept = lenient.segment(SegmentKind::Text, 0).unwrap().extended().first("ENGRDA").unwrap();
        assert!(kept.is_opaque());
        assert_eq!(kept.raw_data(), Some(&b"too short"[..]));

        let strict = ReadOptions { strict_extensions: true };
        let err = Record::read_from(&mut std::io::Cursor::new(&bytes), &catalog, &strict).unwrap_err();
        assert!(err.is_parse());
    }

    /// Custom tables registered on a catalog are used when decoding.
    #[test]
    fn test_custom_catalog_table() {
        let mut catalog = TreCatalog::new();
        catalog.register(
            "POINTS",
            None,
            DescriptorTable::new()
                .field("COUNT", "count", FieldKind::Numeric, 2)
                .repeat(
                    Count::field("COUNT"),
                    DescriptorTable::new()
                        .field("X", "x", FieldKind::Numeric, 3)
                        .field("Y", "y", FieldKind::Numeric, 3),
                ),
        );
        let mut points = catalog.create("POINTS").unwrap();
        points.set_field("COUNT", &2u8).unwrap();
        points.set_field("Y[1]", &17u8).unwrap();

        let ext: Extensions = vec![points].into_iter().collect();
        let decoded = Extensions::decode(&ext.encode().unwrap(), &catalog, true).unwrap();
        let back = decoded.first("POINTS").unwrap();
        assert_eq!(back.current_size().unwrap(), 14);
        assert_eq!(back.get::<u32>("Y[1]").unwrap(), 17);
    }

    /// Plans serialize with serde.
    #[test]
    fn test_plan_json_roundtrip() {
        let plan = plan_segments(&PlanParams::new(100_000, 100, 2).with_max_bytes(10_000_000)).unwrap();
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"row_offset\":50000"));
        let back: SegmentPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);

        let params: PlanParams = serde_json::from_str(
            r#"{"num_rows":10,"num_cols":10,"bytes_per_pixel":1,"rows_per_block":0,
                "cols_per_block":0,"max_rows":99999,"max_bytes":1000}"#,
        )
        .unwrap();
        assert_eq!(plan_segments(&params).unwrap().segments.len(), 1);

        let kind = serde_json::to_string(&SegmentKind::DataExtension).unwrap();
        assert_eq!(kind, "\"DataExtension\"");
    }
}
