use proptest::prelude::*;
use retention_core::encoding::{encode_record, fit_schema, ColumnSpec};
use retention_core::gbdt::{Model, Node, Tree};
use retention_core::scorer::{score_row, RiskScore, DECISION_THRESHOLD};
use retention_core::{Attributor, RawRecord, SchemaRegistry, TreeShapExplainer};

fn hr_registry() -> SchemaRegistry {
    fit_schema(&[
        ColumnSpec::numeric("age"),
        ColumnSpec::numeric("monthlyincome"),
        ColumnSpec::numeric("distancefromhome"),
        ColumnSpec::categorical(
            "department",
            ["Sales", "Research & Development", "Human Resources"],
        ),
        ColumnSpec::categorical(
            "jobrole",
            ["Sales Executive", "Sales Representative", "Manager", "Research Scientist"],
        ),
        ColumnSpec::categorical("overtime", ["No", "Yes"]),
    ])
    .unwrap()
}

fn hr_model(registry: &SchemaRegistry) -> Model {
    let overtime = registry.position("overtime_Yes").unwrap() as i32;
    let income = registry.position("monthlyincome").unwrap() as i32;
    let distance = registry.position("distancefromhome").unwrap() as i32;

    let trees = vec![
        Tree::new(vec![
            Node::internal(0, overtime, 0.5, 1, 2, 1000.0),
            Node::internal(1, income, 3500.0, 3, 4, 700.0),
            Node::leaf(2, 1.1, 300.0),
            Node::leaf(3, 0.4, 200.0),
            Node::leaf(4, -0.7, 500.0),
        ]),
        Tree::new(vec![
            Node::internal(0, distance, 12.0, 1, 2, 1000.0),
            Node::leaf(1, -0.2, 650.0),
            Node::leaf(2, 0.5, 350.0),
        ]),
    ];
    Model::new(trees, -1.5, registry.len(), registry.fingerprint())
}

fn department() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Sales".to_string()),
        Just("Research & Development".to_string()),
        Just("Human Resources".to_string()),
        "[A-Za-z ]{1,12}",
    ]
}

fn raw_record() -> impl Strategy<Value = RawRecord> {
    (
        prop::option::of(18i64..=60),
        prop::option::of(1000i64..=20_000),
        prop::option::of(1i64..=30),
        prop::option::of(department()),
        prop::option::of(prop_oneof![Just("Yes"), Just("No"), Just("Maybe")]),
        prop::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(age, income, distance, dept, overtime, extra)| {
            let mut record = RawRecord::new();
            if let Some(age) = age {
                record.insert("age", age);
            }
            if let Some(income) = income {
                record.insert("monthlyincome", income);
            }
            if let Some(distance) = distance {
                record.insert("distancefromhome", distance);
            }
            if let Some(dept) = dept {
                record.insert("department", dept);
            }
            if let Some(overtime) = overtime {
                record.insert("overtime", overtime);
            }
            if let Some(extra) = extra {
                record.insert(&extra, 1.0);
            }
            record
        })
}

proptest! {
    #[test]
    fn encoded_rows_match_registry_layout(record in raw_record()) {
        let registry = hr_registry();
        let row = encode_record(&record, &registry);

        prop_assert_eq!(row.len(), registry.len());
        prop_assert_eq!(row.fingerprint(), registry.fingerprint());
        prop_assert!(row.ensure_aligned(&registry).is_ok());

        for (idx, name) in registry.iter().enumerate() {
            if let Some(value) = name.strip_prefix("department_") {
                let expected = match record.get("department") {
                    Some(v) if v.to_string() == value => 1.0,
                    _ => 0.0,
                };
                prop_assert_eq!(row.values()[idx], expected);
            }
        }
    }

    #[test]
    fn scores_are_probabilities_with_fixed_threshold(record in raw_record()) {
        let registry = hr_registry();
        let model = hr_model(&registry);
        let row = encode_record(&record, &registry);

        let score = score_row(&model, &registry, &row).unwrap();
        prop_assert!((0.0..=1.0).contains(&score.probability));
        prop_assert_eq!(score.class == 1, score.probability > DECISION_THRESHOLD);
    }

    #[test]
    fn attributions_add_up_to_margin(record in raw_record()) {
        let registry = hr_registry();
        let model = hr_model(&registry);
        let row = encode_record(&record, &registry);

        let attribution = TreeShapExplainer::new(&model).attribute(&row, &registry).unwrap();
        prop_assert_eq!(attribution.len(), registry.len());
        prop_assert!((attribution.total() - model.margin(row.values())).abs() < 1e-9);
    }

    #[test]
    fn binarization_follows_threshold(p in 0.0f64..=1.0) {
        let score = RiskScore::from_probability(p);
        prop_assert_eq!(score.class, u8::from(p > 0.5));
    }
}
