use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use realty_waterfall_core::waterfall::engine::{
    compute_distribution, run_pipeline, DistributionInput, DistributionType,
};
use realty_waterfall_core::waterfall::netting::{net_debt, net_refinance, RefinanceTerms};
use realty_waterfall_core::waterfall::ownership::{
    CapitalLineItem, EntityInvestment, InvestmentStatus, Owner, OwnerKind, OwnershipGraph,
    OwnershipWarning,
};
use realty_waterfall_core::waterfall::report::DistributionReport;
use realty_waterfall_core::waterfall::structure::{Tier, TierKind, TierType, WaterfallStructure};
use realty_waterfall_core::{Currency, DistributionError, EngineConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn person(id: &str, pct: Decimal, capital: Decimal) -> Owner {
    Owner {
        id: format!("own-{id}"),
        holder: OwnerKind::Individual {
            user_id: format!("user-{id}"),
            name: format!("Investor {id}"),
            email: format!("{id}@example.com"),
        },
        ownership_percentage: pct,
        investment_amount: capital,
        breakdown: None,
    }
}

fn entity(id: &str, pct: Decimal, amount: Decimal, owners: Vec<Owner>) -> EntityInvestment {
    EntityInvestment {
        id: format!("ei-{id}"),
        entity_id: format!("ent-{id}"),
        entity_name: format!("{id} Holdings LLC"),
        investment_amount: amount,
        ownership_percentage: pct,
        investment_date: NaiveDate::from_ymd_opt(2022, 1, 15).unwrap(),
        status: InvestmentStatus::Active,
        owners,
    }
}

fn tier(priority: i32, name: &str, kind: TierKind) -> Tier {
    Tier {
        tier_number: priority as u32,
        tier_name: name.into(),
        priority,
        is_active: true,
        kind,
    }
}

fn scenario(tiers: Vec<Tier>, entities: Vec<EntityInvestment>, total: Decimal) -> DistributionInput {
    DistributionInput {
        structure: WaterfallStructure {
            id: "ws-1".into(),
            name: "Oak Street waterfall".into(),
            description: String::new(),
            property_id: Some("prop-oak".into()),
            tiers,
        },
        ownership: OwnershipGraph {
            property_id: "prop-oak".into(),
            entity_investments: entities,
        },
        property_debt: Decimal::ZERO,
        distribution_type: DistributionType::RentalIncome,
        total_amount: Some(total),
        refinance: None,
    }
}

fn pref_and_residual() -> Vec<Tier> {
    vec![
        tier(1, "Preferred Return", TierKind::PreferredReturn { return_rate: dec!(8) }),
        tier(2, "Residual", TierKind::Residual),
    ]
}

fn assert_balanced(report: &DistributionReport) {
    let tiers_total: Decimal = report.by_tier.iter().map(|t| t.total_amount).sum();
    assert_eq!(tiers_total, report.summary.total_distributed);
    assert_eq!(report.summary.total_distributed, report.summary.available_after_debt);
    assert_eq!(report.summary.undistributed_amount, Decimal::ZERO);
    for t in &report.by_tier {
        assert_eq!(
            t.allocated_total(),
            t.total_amount,
            "tier {} does not balance",
            t.tier_name
        );
    }
}

// ===========================================================================
// Worked examples
// ===========================================================================

#[test]
fn test_pref_8000_residual_2000() {
    let input = scenario(
        pref_and_residual(),
        vec![entity("A", dec!(100), dec!(100_000), vec![person("a", dec!(100), dec!(100_000))])],
        dec!(10_000),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    let report = &out.report;

    assert_eq!(report.tier("Preferred Return").unwrap().total_amount, dec!(8_000));
    assert_eq!(report.tier("Residual").unwrap().total_amount, dec!(2_000));
    assert_eq!(report.summary.tiers_processed, 2);
    assert_eq!(report.summary.total_investors, 1);
    assert_eq!(report.summary.total_entities, 1);
    assert_balanced(report);
}

#[test]
fn test_sixty_forty_owner_split() {
    let input = scenario(
        vec![tier(1, "Residual", TierKind::Residual)],
        vec![entity(
            "A",
            dec!(100),
            dec!(100_000),
            vec![
                person("x", dec!(60), dec!(60_000)),
                person("y", dec!(40), dec!(40_000)),
            ],
        )],
        dec!(1_000),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    let residual = out.report.tier("Residual").unwrap();
    let amounts: Vec<(String, Decimal)> = residual
        .investors
        .iter()
        .map(|l| (l.user_id.clone(), l.amount))
        .collect();
    assert_eq!(
        amounts,
        vec![
            ("user-x".to_string(), dec!(600)),
            ("user-y".to_string(), dec!(400)),
        ]
    );
}

#[test]
fn test_refinance_nets_to_392000() {
    let mut input = scenario(
        vec![tier(1, "Residual", TierKind::Residual)],
        vec![entity("A", dec!(100), dec!(100_000), vec![person("a", dec!(100), dec!(100_000))])],
        Decimal::ZERO,
    );
    input.distribution_type = DistributionType::Refinance;
    input.total_amount = None;
    input.property_debt = dec!(100_000);
    input.refinance = Some(RefinanceTerms {
        refinance_amount: dec!(500_000),
        origination_fees: dec!(5_000),
        closing_fees_items: vec![],
        prepayment_penalty: dec!(3_000),
        lender: Some("First Federal".into()),
        interest_rate: Some(dec!(6.25)),
        term_years: Some(30),
    });

    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    let s = &out.report.summary;
    assert_eq!(s.available_after_debt, dec!(392_000));
    assert_eq!(s.total_distributed, dec!(392_000));
    assert_eq!(s.refinance.as_ref().unwrap().net_distributable, dec!(392_000));
    assert_eq!(out.new_debt_amount, Some(dec!(500_000)));
    assert_balanced(&out.report);
}

// ===========================================================================
// Invariants
// ===========================================================================

#[test]
fn test_residual_at_priority_one_takes_everything() {
    let input = scenario(
        vec![
            tier(1, "Residual", TierKind::Residual),
            tier(2, "Preferred Return", TierKind::PreferredReturn { return_rate: dec!(8) }),
            tier(3, "Promote", TierKind::Promote { promote_percentage: dec!(20) }),
        ],
        vec![entity("A", dec!(100), dec!(50_000), vec![person("a", dec!(100), dec!(50_000))])],
        dec!(12_345.67),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    let amounts: Vec<Decimal> = out.report.by_tier.iter().map(|t| t.total_amount).collect();
    assert_eq!(amounts, vec![dec!(12_345.67), dec!(0), dec!(0)]);
    assert_eq!(out.report.summary.tiers_processed, 1);
}

#[test]
fn test_tiers_processed_in_priority_order_not_tier_number() {
    let mut tiers = pref_and_residual();
    // Residual authored first but with the later priority
    tiers.reverse();
    tiers[0].tier_number = 1;
    tiers[1].tier_number = 2;
    let input = scenario(
        tiers,
        vec![entity("A", dec!(100), dec!(100_000), vec![person("a", dec!(100), dec!(100_000))])],
        dec!(10_000),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    assert_eq!(out.report.by_tier[0].tier_type, TierType::PreferredReturn);
    assert_eq!(out.report.by_tier[0].total_amount, dec!(8_000));
}

#[test]
fn test_pool_left_without_residual_is_reported() {
    let input = scenario(
        vec![tier(1, "Preferred Return", TierKind::PreferredReturn { return_rate: dec!(8) })],
        vec![entity("A", dec!(100), dec!(100_000), vec![person("a", dec!(100), dec!(100_000))])],
        dec!(10_000),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    let s = &out.report.summary;
    assert_eq!(s.total_distributed, dec!(8_000));
    assert_eq!(s.undistributed_amount, dec!(2_000));
    assert_eq!(s.total_distributed + s.undistributed_amount, s.available_after_debt);
}

#[test]
fn test_inactive_tier_skipped() {
    let mut tiers = pref_and_residual();
    tiers[0].is_active = false;
    let input = scenario(
        tiers,
        vec![entity("A", dec!(100), dec!(100_000), vec![person("a", dec!(100), dec!(100_000))])],
        dec!(10_000),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    assert_eq!(out.report.by_tier.len(), 1);
    assert_eq!(out.report.by_tier[0].total_amount, dec!(10_000));
}

#[test]
fn test_debt_exceeding_amount_distributes_zero() {
    let mut input = scenario(
        pref_and_residual(),
        vec![entity("A", dec!(100), dec!(100_000), vec![person("a", dec!(100), dec!(100_000))])],
        dec!(5_000),
    );
    input.property_debt = dec!(7_500);
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    let s = &out.report.summary;
    assert_eq!(s.debt_subtracted, dec!(5_000));
    assert_eq!(s.available_after_debt, Decimal::ZERO);
    assert_eq!(s.total_distributed, Decimal::ZERO);
    assert_eq!(s.tiers_processed, 0);
    assert_eq!(out.report.by_tier.len(), 2);
}

#[test]
fn test_rounding_residual_keeps_totals_exact() {
    let input = scenario(
        vec![
            tier(1, "Preferred Return", TierKind::PreferredReturn { return_rate: dec!(7.5) }),
            tier(2, "Promote", TierKind::Promote { promote_percentage: dec!(33.333) }),
            tier(3, "Residual", TierKind::Residual),
        ],
        vec![
            entity(
                "A",
                dec!(33.3),
                dec!(33_333),
                vec![
                    person("a", dec!(33.34), dec!(11_111)),
                    person("b", dec!(33.33), dec!(11_111)),
                    person("c", dec!(33.33), dec!(11_111)),
                ],
            ),
            entity(
                "B",
                dec!(66.7),
                dec!(66_667),
                vec![person("d", dec!(70), dec!(46_667)), person("e", dec!(30), dec!(20_000))],
            ),
        ],
        dec!(10_000.01),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    assert_balanced(&out.report);
    assert_eq!(out.report.summary.unattributed_amount, Decimal::ZERO);
    assert_eq!(out.report.total_attributed(), dec!(10_000.01));
    for t in &out.report.by_tier {
        for line in &t.investors {
            assert!(line.amount.scale() <= 2, "{} not rounded to cents", line.amount);
        }
    }
}

#[test]
fn test_yen_rounds_to_whole_units() {
    let input = scenario(
        vec![tier(1, "Residual", TierKind::Residual)],
        vec![entity(
            "A",
            dec!(100),
            dec!(1_000_000),
            vec![
                person("a", dec!(33.34), dec!(333_400)),
                person("b", dec!(33.33), dec!(333_300)),
                person("c", dec!(33.33), dec!(333_300)),
            ],
        )],
        dec!(1_000),
    );
    let config = EngineConfig {
        currency: Currency::JPY,
        ..EngineConfig::default()
    };
    let out = run_pipeline(&input, &config).unwrap();
    let amounts: Vec<Decimal> = out.report.by_tier[0].investors.iter().map(|l| l.amount).collect();
    assert_eq!(amounts, vec![dec!(334), dec!(333), dec!(333)]);
}

// ===========================================================================
// Ownership edge cases
// ===========================================================================

#[test]
fn test_owner_shortfall_leaves_visible_remainder() {
    let input = scenario(
        vec![tier(1, "Residual", TierKind::Residual)],
        vec![entity("A", dec!(100), dec!(100_000), vec![person("a", dec!(75), dec!(75_000))])],
        dec!(4_000),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    let residual = out.report.tier("Residual").unwrap();
    assert_eq!(residual.investors[0].amount, dec!(3_000));
    assert_eq!(residual.unattributed, dec!(1_000));
    assert_eq!(
        out.report.warnings,
        vec![OwnershipWarning::PercentageShortfall {
            entity_investment_id: "ei-A".into(),
            attributed_percentage: dec!(75),
        }]
    );
    assert_balanced(&out.report);
}

#[test]
fn test_same_investor_through_two_entities_counted_once() {
    let input = scenario(
        vec![tier(1, "Residual", TierKind::Residual)],
        vec![
            entity("A", dec!(50), dec!(50_000), vec![person("shared", dec!(100), dec!(50_000))]),
            entity(
                "B",
                dec!(50),
                dec!(50_000),
                vec![
                    person("shared", dec!(50), dec!(25_000)),
                    person("other", dec!(50), dec!(25_000)),
                ],
            ),
        ],
        dec!(2_000),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    let residual = out.report.tier("Residual").unwrap();
    assert_eq!(residual.investors.len(), 2);
    assert_eq!(residual.investors[0].user_id, "user-shared");
    assert_eq!(residual.investors[0].amount, dec!(1_500));
    assert_eq!(out.report.summary.total_investors, 2);
    assert_eq!(out.report.summary.total_entities, 2);
}

#[test]
fn test_preferred_return_uses_headline_investment() {
    let mut owner = person("a", dec!(100), dec!(100_000));
    owner.breakdown = Some(vec![
        CapitalLineItem {
            label: "Initial equity".into(),
            amount: dec!(40_000),
        },
        CapitalLineItem {
            label: "Capital call".into(),
            amount: dec!(10_000),
        },
    ]);
    let input = scenario(
        pref_and_residual(),
        vec![entity("A", dec!(100), dec!(100_000), vec![owner])],
        dec!(10_000),
    );
    let out = run_pipeline(&input, &EngineConfig::default()).unwrap();
    // 8% of the 100,000 investment amount; the 50,000 breakdown is bookkeeping only
    assert_eq!(out.report.tier("Preferred Return").unwrap().total_amount, dec!(8_000));
    assert_eq!(out.report.tier("Residual").unwrap().total_amount, dec!(2_000));
    assert!(out
        .report
        .warnings
        .iter()
        .any(|w| matches!(w, OwnershipWarning::BreakdownMismatch { .. })));
}

#[test]
fn test_no_entity_investments_rejected() {
    let input = scenario(pref_and_residual(), vec![], dec!(10_000));
    match run_pipeline(&input, &EngineConfig::default()).unwrap_err() {
        DistributionError::InvalidInput { field, .. } => assert_eq!(field, "entity_investments"),
        other => panic!("Expected InvalidInput, got: {other:?}"),
    }
}

// ===========================================================================
// Netting stages
// ===========================================================================

#[test]
fn test_refinance_shortfall_is_an_error() {
    let terms = RefinanceTerms {
        refinance_amount: dec!(100_000),
        origination_fees: dec!(2_000),
        closing_fees_items: vec![],
        prepayment_penalty: Decimal::ZERO,
        lender: None,
        interest_rate: None,
        term_years: None,
    };
    match net_refinance(&terms, dec!(99_000)).unwrap_err() {
        DistributionError::InsufficientRefinanceProceeds { net_distributable } => {
            assert_eq!(net_distributable, dec!(-1_000))
        }
        other => panic!("Expected InsufficientRefinanceProceeds, got: {other:?}"),
    }
}

#[test]
fn test_debt_netting_clamps_at_zero() {
    let netted = net_debt(dec!(1_000), dec!(2_500));
    assert_eq!(netted.debt_subtracted, dec!(1_000));
    assert_eq!(netted.available_after_debt, Decimal::ZERO);
}

#[test]
fn test_compute_distribution_json_shape() {
    let input = scenario(
        pref_and_residual(),
        vec![entity("A", dec!(100), dec!(100_000), vec![person("a", dec!(100), dec!(100_000))])],
        dec!(10_000),
    );
    let out = compute_distribution(&input, &EngineConfig::default()).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    let money = |v: &serde_json::Value| v.as_str().unwrap().parse::<Decimal>().unwrap();

    // Decimals travel as strings
    assert_eq!(money(&json["result"]["summary"]["total_distributed"]), dec!(10_000));
    assert_eq!(money(&json["result"]["by_tier"][1]["investors"][0]["amount"]), dec!(2_000));
    assert_eq!(json["result"]["by_tier"][0]["tier_type"], "PREFERRED_RETURN");
    assert_eq!(json["metadata"]["precision"], "rust_decimal_128bit");
}
