#[cfg(test)]
mod tests {
    use crate::res::chunk::{self, Chunk};
    use crate::res::cursor::ByteCursor;
    use crate::res::AttributeId;
    use crate::tests::fixtures::{resource_table, AttrValue, EntrySpec, TypeSpec, XmlDocBuilder};
    use crate::{decode_binary_xml, decode_resource_table};

    fn sample_table() -> Vec<u8> {
        resource_table(
            &["Example App"],
            0x7f,
            "com.example",
            &["attr", "string"],
            &["app_name", "padding", "alias", "styled"],
            &[TypeSpec {
                id: 2,
                entries: vec![
                    Some(EntrySpec::Simple(0, 0x03, 0)), // string "Example App"
                    Some(EntrySpec::Simple(1, 0x05, (1 << 8) | 0x1)), // 1.0dip
                    Some(EntrySpec::Simple(2, 0x01, 0x7f02_0000)), // @app_name
                    Some(EntrySpec::Complex(3)),
                    None,
                ],
            }],
        )
    }

    #[test]
    fn resolves_resource_ids_through_the_package() {
        let bytes = sample_table();
        let table = decode_resource_table(&bytes).unwrap();

        let package = table.package_by_id(0x7f).unwrap();
        assert_eq!(package.name, "com.example");
        assert_eq!(package.type_name(2), "string");

        assert_eq!(table.resolve(0x7f02_0000).as_deref(), Some("Example App"));
        assert_eq!(table.resolve(0x7f02_0001).as_deref(), Some("1.0dip"));
    }

    #[test]
    fn references_chain_to_their_target() {
        let bytes = sample_table();
        let table = decode_resource_table(&bytes).unwrap();
        assert_eq!(table.resolve(0x7f02_0002).as_deref(), Some("Example App"));
    }

    #[test]
    fn complex_entries_render_as_type_and_key() {
        let bytes = sample_table();
        let table = decode_resource_table(&bytes).unwrap();
        assert_eq!(table.resolve(0x7f02_0003).as_deref(), Some("@string/styled"));
    }

    #[test]
    fn absent_entries_resolve_to_none() {
        let bytes = sample_table();
        let table = decode_resource_table(&bytes).unwrap();
        assert_eq!(table.resolve(0x7f02_0004), None);
        assert_eq!(table.resolve(0x7f05_0000), None);
        assert_eq!(table.resolve(0x0102_0000), None);
    }

    #[test]
    fn reference_cycles_degrade_to_placeholders() {
        let bytes = resource_table(
            &[],
            0x7f,
            "com.example",
            &["string"],
            &["loop"],
            &[TypeSpec {
                id: 1,
                // Entry references itself.
                entries: vec![Some(EntrySpec::Simple(0, 0x01, 0x7f01_0000))],
            }],
        );
        let table = decode_resource_table(&bytes).unwrap();
        let expected = format!("U[{}]", 0x7f01_0000u32 as i32);
        assert_eq!(table.resolve(0x7f01_0000), Some(expected));
    }

    #[test]
    fn unknown_chunks_are_clamped_and_siblings_survive() {
        let mut doc = XmlDocBuilder::new(&[]);
        doc.start("before", &[]);
        doc.end("before");
        // Well-sized chunk of an unrecognized type.
        let mut bogus = Vec::new();
        bogus.extend_from_slice(&0x00ffu16.to_le_bytes());
        bogus.extend_from_slice(&8u16.to_le_bytes());
        bogus.extend_from_slice(&12u32.to_le_bytes());
        bogus.extend_from_slice(&0xdeadbeefu32.to_le_bytes());
        doc.raw(&bogus);
        doc.start("after", &[]);
        doc.end("after");
        let bytes = doc.build();

        let tree = decode_binary_xml(&bytes, None).unwrap();
        let names: Vec<&str> = tree
            .document()
            .start_elements()
            .map(|el| tree.document().element_name(el))
            .collect();
        assert_eq!(names, vec!["before", "after"]);

        let unknowns: Vec<&Chunk> = tree
            .document()
            .chunks()
            .iter()
            .filter(|c| matches!(c, Chunk::Unknown(_)))
            .collect();
        assert_eq!(unknowns.len(), 1);
        let Chunk::Unknown(unknown) = unknowns[0] else { unreachable!() };
        assert_eq!(unknown.type_tag, 0x00ff);
    }

    #[test]
    fn oversized_chunk_degrades_to_a_diagnosed_unknown() {
        // Chunk whose declared size exceeds the remaining input.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x00ffu16.to_le_bytes());
        bytes.extend_from_slice(&8u16.to_le_bytes());
        bytes.extend_from_slice(&4096u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);

        let mut cursor = ByteCursor::new(&bytes);
        let decoded = chunk::decode_chunk(&mut cursor, bytes.len()).unwrap();
        let Chunk::Unknown(unknown) = decoded else {
            panic!("expected an unknown chunk");
        };
        assert_eq!(unknown.declared_size, 4096);
        assert!(unknown.diagnostic.is_some());
        // The cursor lands on the clamped end, not the declared one.
        assert_eq!(cursor.position(), bytes.len());
    }

    #[test]
    fn chunks_within_brackets_nested_same_name_elements() {
        let mut doc = XmlDocBuilder::new(&[]);
        doc.start("outer", &[]);
        doc.start("item", &[]);
        doc.start("item", &[]);
        doc.end("item");
        doc.end("item");
        doc.start("tail", &[]);
        doc.end("tail");
        doc.end("outer");
        doc.start("sibling", &[]);
        doc.end("sibling");
        let bytes = doc.build();

        let tree = decode_binary_xml(&bytes, None).unwrap();
        let document = tree.document();
        let outer = document
            .start_elements()
            .find(|el| document.element_name(el) == "outer")
            .unwrap();
        let within = document.chunks_within(outer);
        // Both item brackets, the item end brackets, and tail; never the
        // outer terminator or the sibling after it.
        assert_eq!(within.len(), 6);
        let start_names: Vec<&str> = within
            .iter()
            .filter_map(|c| match c {
                Chunk::XmlStartElement(el) => Some(document.element_name(el)),
                _ => None,
            })
            .collect();
        assert_eq!(start_names, vec!["item", "item", "tail"]);
    }

    #[test]
    fn attributes_render_through_the_resource_table() {
        let table_bytes = sample_table();
        let table = decode_resource_table(&table_bytes).unwrap();

        let mut doc = XmlDocBuilder::new(&[(AttributeId::LABEL.0, "label")]);
        doc.start("widget", &[(0, AttrValue::reference(0x7f02_0000))]);
        doc.end("widget");
        let mut doc2 = XmlDocBuilder::new(&[(AttributeId::LABEL.0, "label")]);
        let value = doc2.intern("inline");
        doc2.start("widget", &[(0, AttrValue::string(value))]);
        doc2.end("widget");

        let bytes = doc.build();
        let tree = decode_binary_xml(&bytes, Some(&table)).unwrap();
        let widget = tree.document().start_elements().next().unwrap();
        assert_eq!(tree.attribute(widget, AttributeId::LABEL), "Example App");
        // An id the document never maps misses to "".
        assert_eq!(tree.attribute(widget, AttributeId::ICON), "");

        let bytes2 = doc2.build();
        let tree2 = decode_binary_xml(&bytes2, None).unwrap();
        let widget2 = tree2.document().start_elements().next().unwrap();
        assert_eq!(tree2.attribute(widget2, AttributeId::LABEL), "inline");
        assert_eq!(tree2.attribute_named(widget2, "label"), "inline");
    }
}
