#[cfg(test)]
mod tests {
    use crate::analysis::complexity::MAX_CALL_DEPTH;
    use crate::analysis::{analyze_units, ComplexityEngine};
    use crate::tests::fixtures::{
        ins, DexBuilder, FailingDecoder, StubDecoder, OP_CONST_STRING, OP_IF, OP_INVOKE,
        OP_INVOKE_WIDE, OP_NOP, OP_RETURN, OP_SWITCH, OP_THROW,
    };
    use crate::BytecodeUnit;

    const FOO: &str = "Lcom/example/Foo;";

    /// One unit, one main class: a straight-line method, a branchy one, a
    /// local callee chain, and a method leaning on framework calls.
    fn sample_unit() -> BytecodeUnit {
        let mut b = DexBuilder::new();
        let simple = b.method(FOO, "simple");
        let branchy = b.method(FOO, "branchy");
        let callee = b.method(FOO, "callee");
        let caller = b.method(FOO, "caller");
        let api = b.method(FOO, "api");
        let log_d = b.method("Landroid/util/Log;", "d");
        let local_go = b.method("Lcom/google/Local;", "go");

        b.class(
            FOO,
            vec![
                (simple, vec![ins(OP_NOP, 0), ins(OP_RETURN, 0)]),
                (
                    branchy,
                    vec![ins(OP_IF, 0), ins(OP_RETURN, 0), ins(OP_RETURN, 0)],
                ),
                (
                    callee,
                    vec![ins(OP_IF, 0), ins(OP_IF, 0), ins(OP_RETURN, 0)],
                ),
                (
                    caller,
                    vec![ins(OP_INVOKE, callee as u8), ins(OP_RETURN, 0)],
                ),
                (
                    api,
                    vec![
                        ins(OP_INVOKE, log_d as u8),
                        ins(OP_INVOKE, local_go as u8),
                        ins(OP_CONST_STRING, 0),
                        ins(OP_RETURN, 0),
                    ],
                ),
            ],
        );
        b.class("Lcom/google/Local;", vec![(local_go, vec![ins(OP_RETURN, 0)])]);

        BytecodeUnit::index("classes.dex", &b.build()).unwrap()
    }

    fn complexity(unit: &BytecodeUnit, class: &str, signature: &str) -> i64 {
        unit.classes[class].methods[signature]
            .cyclomatic_complexity
            .unwrap()
    }

    #[test]
    fn scores_methods_by_decisions_and_exits() {
        let mut units = vec![sample_unit()];
        analyze_units(&mut units, &StubDecoder);
        let unit = &units[0];

        // decisionPoints - exits + 2 throughout.
        assert_eq!(complexity(unit, FOO, "simple()V"), 1);
        assert_eq!(complexity(unit, FOO, "branchy()V"), 1);
        assert_eq!(complexity(unit, FOO, "callee()V"), 3);
        // A local callee contributes its whole complexity to the call site.
        assert_eq!(complexity(unit, FOO, "caller()V"), 4);
        // A framework callee and a pruned-but-local one count 1 each.
        assert_eq!(complexity(unit, FOO, "api()V"), 3);
    }

    #[test]
    fn switches_and_throws_count_into_the_score() {
        let mut b = DexBuilder::new();
        let twisty = b.method(FOO, "twisty");
        b.class(
            FOO,
            vec![(
                twisty,
                vec![ins(OP_SWITCH, 3), ins(OP_THROW, 0), ins(OP_RETURN, 0)],
            )],
        );
        let mut units = vec![BytecodeUnit::index("classes.dex", &b.build()).unwrap()];
        analyze_units(&mut units, &StubDecoder);

        // 3 cases + 1 throw decision, throw + return exits: 4 - 2 + 2.
        assert_eq!(complexity(&units[0], FOO, "twisty()V"), 4);
    }

    #[test]
    fn prunes_references_into_locally_declared_classes() {
        let mut units = vec![sample_unit()];
        analyze_units(&mut units, &StubDecoder);
        let unit = &units[0];

        let api_method = &unit.classes[FOO].methods["api()V"];
        assert_eq!(api_method.api_counts.get("Landroid/util/Log;->d()V"), Some(&1));
        // Declared in this unit, so not a framework reference after all.
        assert!(!api_method.api_counts.contains_key("Lcom/google/Local;->go()V"));

        assert_eq!(unit.api_counts.get("Landroid/util/Log;->d()V"), Some(&1));
        assert!(!unit.api_counts.contains_key("Lcom/google/Local;->go()V"));
    }

    #[test]
    fn array_class_references_match_through_their_base_type() {
        let mut b = DexBuilder::new();
        let copier = b.method(FOO, "copier");
        let clone = b.method("[Ljava/lang/Object;", "clone");
        b.class(
            FOO,
            vec![(copier, vec![ins(OP_INVOKE, clone as u8), ins(OP_RETURN, 0)])],
        );
        let mut units = vec![BytecodeUnit::index("classes.dex", &b.build()).unwrap()];
        analyze_units(&mut units, &StubDecoder);

        // The counter keeps the raw descriptor; only the allow-list match
        // strips the array brackets.
        let copier = &units[0].classes[FOO].methods["copier()V"];
        assert_eq!(copier.api_counts.get("[Ljava/lang/Object;->clone()V"), Some(&1));
        assert_eq!(
            units[0].api_counts.get("[Ljava/lang/Object;->clone()V"),
            Some(&1)
        );
    }

    #[test]
    fn aggregates_roll_up_to_class_and_unit() {
        let mut units = vec![sample_unit()];
        analyze_units(&mut units, &StubDecoder);
        let unit = &units[0];

        let foo = &unit.classes[FOO];
        assert_eq!(foo.methods.len(), 5);
        // Mean of 1, 1, 3, 4, 3.
        assert!((foo.cyclomatic_complexity - 2.4).abs() < 1e-9);
        let local = &unit.classes["Lcom/google/Local;"];
        assert!((local.cyclomatic_complexity - 1.0).abs() < 1e-9);
        // Unit complexity is the mean over classes.
        assert!((unit.cyclomatic_complexity - 1.7).abs() < 1e-9);

        // Instruction counts include the two-unit encodings as decoded.
        assert_eq!(foo.instruction_count, 14);
        assert_eq!(unit.instruction_count, 15);
        assert_eq!(unit.register_count, 6 * 2);
        assert_eq!(unit.failed_methods, 0);
    }

    #[test]
    fn mutual_recursion_terminates() {
        let mut b = DexBuilder::new();
        let ping = b.method(FOO, "ping");
        let pong = b.method(FOO, "pong");
        b.class(
            FOO,
            vec![
                (ping, vec![ins(OP_INVOKE, pong as u8), ins(OP_RETURN, 0)]),
                (pong, vec![ins(OP_INVOKE, ping as u8), ins(OP_RETURN, 0)]),
            ],
        );
        let mut units = vec![BytecodeUnit::index("classes.dex", &b.build()).unwrap()];
        analyze_units(&mut units, &StubDecoder);

        // The revisited side of the cycle counts as one decision point, so
        // whichever method is walked first scores 4 and the other 3.
        let mut scores = vec![
            complexity(&units[0], FOO, "ping()V"),
            complexity(&units[0], FOO, "pong()V"),
        ];
        scores.sort_unstable();
        assert_eq!(scores, vec![3, 4]);
    }

    #[test]
    fn memoizes_scores_across_units() {
        let mut b1 = DexBuilder::new();
        let helper = b1.method("Lx/X;", "helper");
        b1.class(
            "Lx/X;",
            vec![(
                helper,
                vec![ins(OP_IF, 0), ins(OP_IF, 0), ins(OP_RETURN, 0)],
            )],
        );

        let mut b2 = DexBuilder::new();
        let helper_ref = b2.method("Lx/X;", "helper");
        let caller = b2.method("Ly/Y;", "caller");
        b2.class(
            "Ly/Y;",
            vec![(
                caller,
                vec![ins(OP_INVOKE, helper_ref as u8), ins(OP_RETURN, 0)],
            )],
        );

        let mut units = vec![
            BytecodeUnit::index("classes.dex", &b1.build()).unwrap(),
            BytecodeUnit::index("classes2.dex", &b2.build()).unwrap(),
        ];
        for unit in &mut units {
            unit.analyze_classes(&StubDecoder);
        }
        let mut engine = ComplexityEngine::new();
        engine.run(&mut units);

        assert_eq!(engine.complexity_of("Lx/X;->helper()V"), Some(3));
        // The cross-unit call sees the memoized callee score.
        assert_eq!(engine.complexity_of("Ly/Y;->caller()V"), Some(4));
    }

    #[test]
    fn deep_call_chains_stop_at_the_depth_cap() {
        const CHAIN: usize = 600;
        let mut b = DexBuilder::new();
        let ids: Vec<u32> = (0..CHAIN)
            .map(|i| b.method("Lc/C;", &format!("f{i}")))
            .collect();
        let methods = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let units = if i + 1 < CHAIN {
                    vec![
                        ins(OP_INVOKE_WIDE, 0),
                        ids[i + 1] as u16,
                        ins(OP_RETURN, 0),
                    ]
                } else {
                    vec![ins(OP_RETURN, 0)]
                };
                (id, units)
            })
            .collect();
        b.class("Lc/C;", methods);

        let mut units = vec![BytecodeUnit::index("classes.dex", &b.build()).unwrap()];
        analyze_units(&mut units, &StubDecoder);

        // Roots are walked in descriptor order, so the head of the chain is
        // scored first and its walk is the one that hits the cap: without
        // the cap it would score the full chain length + 1, but the call at
        // the cap boundary degrades to a flat decision point instead.
        let head = complexity(&units[0], "Lc/C;", "f0()V");
        assert_eq!(head, MAX_CALL_DEPTH as i64 + 1);
        assert!(head < CHAIN as i64, "head scored {head}");
    }

    #[test]
    fn a_failing_instruction_source_is_counted_not_fatal() {
        let mut units = vec![sample_unit()];
        analyze_units(&mut units, &FailingDecoder);
        let unit = &units[0];

        assert_eq!(unit.failed_methods, 6);
        assert_eq!(unit.classes.len(), 2);
        assert!(unit.classes[FOO].methods.is_empty());
    }

    #[test]
    fn string_references_are_counted_for_every_method() {
        let mut units = vec![sample_unit()];
        analyze_units(&mut units, &StubDecoder);
        let unit = &units[0];

        // const-string 0 names the first interned string.
        let api_method = &unit.classes[FOO].methods["api()V"];
        assert_eq!(api_method.string_reference_counts.get(FOO), Some(&1));
        assert_eq!(unit.string_reference_counts.get(FOO), Some(&1));
    }
}
