use frontline_core::{
    Action, Board, BreachEvent, CrossingEvent, DamageEvent, DeathEvent, EdgeSide, Location, Owner,
    ResourcePool, SpawnEvent, StationaryUnit, StructureClass, TurnActions, UnitCatalog, UnitKind,
};
use frontline_system_defense::{DefenseConfig, DefensePlanner, DefenseReport};
use frontline_system_events::TurnSummary;
use frontline_world::TurnState;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn state(structure: f64, movement: f64) -> TurnState {
    TurnState::new(
        UnitCatalog::standard(),
        5,
        ResourcePool::new(structure, movement),
    )
}

fn breached_at(x: i32, y: i32) -> TurnSummary {
    let mut summary = TurnSummary::default();
    summary.breaches.push(BreachEvent {
        location: Location::new(x, y),
        frame: 0,
    });
    summary
}

fn damaged_at(x: i32, y: i32, class: StructureClass) -> TurnSummary {
    let mut summary = TurnSummary::default();
    summary.damage.push(DamageEvent {
        location: Location::new(x, y),
        amount: 45.0,
        class,
    });
    summary
}

#[test]
fn breach_on_empty_front_line_places_wall_and_turret_behind() {
    let planner = DefensePlanner::default();
    let mut state = state(10.0, 0.0);

    let report = planner.respond_to_breaches(&mut state, &breached_at(5, 13));

    assert_eq!(report.placed, 2);
    assert_eq!(
        state.pending().build[..2],
        [
            Action::Place {
                kind: UnitKind::Wall,
                location: Location::new(5, 13),
            },
            Action::Place {
                kind: UnitKind::Turret,
                location: Location::new(5, 12),
            },
        ]
    );
    assert_eq!(state.resources().structure(), 7.0);
}

#[test]
fn repeated_breach_response_upgrades_then_settles() {
    let planner = DefensePlanner::default();
    let mut state = state(10.0, 0.0);
    let summary = breached_at(5, 13);

    let _ = planner.respond_to_breaches(&mut state, &summary);
    let second = planner.respond_to_breaches(&mut state, &summary);
    assert_eq!(second.upgraded, 2, "existing structures are upgraded, not re-placed");
    assert_eq!(second.placed, 0);

    let settled = state.pending().build.len();
    let third = planner.respond_to_breaches(&mut state, &summary);

    assert!(third.is_empty());
    assert_eq!(state.pending().build.len(), settled);
}

#[test]
fn fully_built_layout_produces_no_new_requests() {
    let planner = DefensePlanner::default();
    let mut state = state(200.0, 0.0);
    let summary = TurnSummary::default();

    let first = planner.plan(&mut state, &summary, &[]);
    assert!(first.placed > 0);
    let built = state.pending().clone();

    let second = planner.plan(&mut state, &summary, &[]);

    assert_eq!(second, DefenseReport::default());
    assert_eq!(state.pending(), &built);
}

#[test]
fn badly_damaged_structure_is_removed_rebuilt_and_upgraded() {
    let planner = DefensePlanner::default();
    let mut state = state(10.0, 0.0);
    let location = Location::new(9, 6);
    let _ = state.insert_unit(StationaryUnit {
        kind: UnitKind::Turret,
        owner: Owner::Me,
        health: 30.0,
        max_health: 75.0,
        location,
        upgraded: false,
    });

    let report = planner.repair(&mut state, &damaged_at(9, 6, StructureClass::Turret));

    assert_eq!(
        state.pending().build,
        vec![
            Action::Remove { location },
            Action::Place {
                kind: UnitKind::Turret,
                location,
            },
            Action::Upgrade { location },
        ]
    );
    assert_eq!(report.removed, 1);
    assert_eq!(report.upgraded, 1);
    assert_eq!(state.resources().structure(), 4.0);
    let rebuilt = state.occupant(location).copied().expect("turret");
    assert_eq!(rebuilt.health_ratio(), 1.0);
}

#[test]
fn rebuild_skips_upgrade_when_budget_runs_short() {
    let planner = DefensePlanner::default();
    let mut state = state(3.0, 0.0);
    let location = Location::new(9, 6);
    let _ = state.insert_unit(StationaryUnit {
        kind: UnitKind::Turret,
        owner: Owner::Me,
        health: 30.0,
        max_health: 75.0,
        location,
        upgraded: false,
    });

    let report = planner.repair(&mut state, &damaged_at(9, 6, StructureClass::Turret));

    assert_eq!(report.removed, 1);
    assert_eq!(report.placed, 1);
    assert_eq!(report.upgraded, 0);
    assert_eq!(state.resources().structure(), 1.0);
}

#[test]
fn unaffordable_rebuild_keeps_the_damaged_structure() {
    let planner = DefensePlanner::default();
    let mut state = state(1.0, 0.0);
    let location = Location::new(9, 6);
    let _ = state.insert_unit(StationaryUnit {
        kind: UnitKind::Turret,
        owner: Owner::Me,
        health: 10.0,
        max_health: 75.0,
        location,
        upgraded: false,
    });

    let report = planner.repair(&mut state, &damaged_at(9, 6, StructureClass::Turret));

    assert!(report.is_empty());
    assert!(state.is_occupied(location));
}

#[test]
fn lightly_damaged_structure_is_left_alone() {
    let planner = DefensePlanner::default();
    let mut state = state(10.0, 0.0);
    let location = Location::new(9, 6);
    let _ = state.insert_unit(StationaryUnit {
        kind: UnitKind::Turret,
        owner: Owner::Me,
        health: 40.0,
        max_health: 75.0,
        location,
        upgraded: false,
    });

    let report = planner.repair(&mut state, &damaged_at(9, 6, StructureClass::Turret));

    assert!(report.is_empty());
    assert!(state.pending().is_empty());
}

#[test]
fn vanished_and_destroyed_structures_are_rebuilt() {
    let planner = DefensePlanner::default();
    let mut state = state(10.0, 0.0);
    let mut summary = damaged_at(4, 12, StructureClass::Wall);
    summary.deaths.push(DeathEvent {
        location: Location::new(12, 12),
        kind: UnitKind::Turret,
        owner: Owner::Me,
        self_destruct: false,
    });

    let report = planner.repair(&mut state, &summary);

    assert_eq!(report.placed, 2);
    assert_eq!(
        state.occupant(Location::new(4, 12)).map(|unit| unit.kind),
        Some(UnitKind::Wall)
    );
    assert_eq!(
        state.occupant(Location::new(12, 12)).map(|unit| unit.kind),
        Some(UnitKind::Turret)
    );
}

#[test]
fn reinforcement_leaves_reserved_cells_free() {
    let planner = DefensePlanner::default();
    let mut state = state(100.0, 0.0);
    let reserved = [Location::new(1, 12), Location::new(20, 12)];

    let report = planner.reinforce(&mut state, &reserved);

    let sites = planner.config().reinforcement.sites().count() as u32;
    assert_eq!(report.placed, sites - 2);
    assert!(!state.is_occupied(Location::new(1, 12)));
    assert!(!state.is_occupied(Location::new(20, 12)));
    assert!(state.is_occupied(Location::new(26, 12)));
}

#[test]
fn interceptors_are_skipped_without_votes() {
    let planner = DefensePlanner::default();
    let mut state = state(0.0, 10.0);

    let report = planner.deploy_interceptors(&mut state, &TurnSummary::default());

    assert!(report.is_empty());
    assert_eq!(state.resources().movement(), 10.0);
}

#[test]
fn interceptors_follow_breach_votes_within_budget_share() {
    let planner = DefensePlanner::default();
    let mut state = state(0.0, 10.0);

    let report = planner.deploy_interceptors(&mut state, &breached_at(3, 10));

    assert_eq!(report.interceptors, 5);
    assert_eq!(
        state
            .pending()
            .deployed(UnitKind::Interceptor, Location::new(3, 10)),
        5
    );
    assert_eq!(state.resources().movement(), 5.0);
}

#[test]
fn spawn_votes_land_on_the_mirrored_origin() {
    let planner = DefensePlanner::default();
    let board = state(0.0, 0.0);
    let mut summary = TurnSummary::default();
    summary.push_spawn(SpawnEvent {
        location: Location::new(14, 27),
        kind: UnitKind::Scout,
        spawn_id: "17".to_owned(),
        owner: Owner::Opponent,
    });

    let votes = planner.interceptor_votes(&board, &summary);

    assert_eq!(votes.len(), 1);
    assert_eq!(votes.get(&Location::new(14, 0)), Some(&1));
}

#[test]
fn midline_crossings_vote_where_the_lane_reaches_our_edge() {
    let planner = DefensePlanner::default();
    let board = state(0.0, 0.0);
    let mut summary = TurnSummary::default();
    summary.crossings.push(CrossingEvent {
        spawn_id: "17".to_owned(),
        kind: UnitKind::Scout,
        origin: Location::new(14, 27),
        location: Location::new(17, 13),
    });

    let votes = planner.interceptor_votes(&board, &summary);

    assert_eq!(votes.values().sum::<u32>(), 2);
    let target = board.edge_locations(EdgeSide::BottomLeft);
    assert!(votes.keys().all(|cell| target.contains(cell)));
}

#[test]
fn tied_votes_still_share_a_single_interceptor() {
    let planner = DefensePlanner::default();
    let mut state = state(0.0, 3.0);
    let mut summary = breached_at(3, 10);
    summary.breaches.push(BreachEvent {
        location: Location::new(24, 10),
        frame: 0,
    });

    let report = planner.deploy_interceptors(&mut state, &summary);

    assert_eq!(report.interceptors, 1);
    assert_eq!(
        state
            .pending()
            .deployed(UnitKind::Interceptor, Location::new(3, 10)),
        1
    );
    assert_eq!(state.resources().movement(), 2.0);
}

#[test]
fn blocked_vote_site_shifts_interceptors_to_nearest_edge_cell() {
    let planner = DefensePlanner::default();
    let mut state = state(0.0, 10.0);
    let _ = state.seed_structure(UnitKind::Wall, Owner::Me, Location::new(3, 10));

    let report = planner.deploy_interceptors(&mut state, &breached_at(3, 10));

    assert_eq!(report.interceptors, 5);
    let pending = state.pending();
    assert_eq!(pending.deployed(UnitKind::Interceptor, Location::new(3, 10)), 0);
    assert_eq!(pending.deployed(UnitKind::Interceptor, Location::new(4, 9)), 5);
    assert_eq!(pending.deployed(UnitKind::Interceptor, Location::new(2, 11)), 0);
    assert_eq!(state.resources().movement(), 5.0);
}

#[test]
fn zero_weights_disable_a_vote_source() {
    let mut config = DefenseConfig::default();
    config.vote_weights.breach = 0;
    let planner = DefensePlanner::new(config);
    let mut state = state(0.0, 10.0);

    let report = planner.deploy_interceptors(&mut state, &breached_at(3, 10));

    assert!(report.is_empty());
}

#[test]
fn breaches_near_the_edge_get_flank_turrets() {
    let planner = DefensePlanner::default();
    let mut state = state(100.0, 0.0);

    let report = planner.respond_to_breaches(&mut state, &breached_at(3, 10));

    let turrets = state
        .pending()
        .build
        .iter()
        .filter(|action| {
            matches!(
                action,
                Action::Place {
                    kind: UnitKind::Turret,
                    ..
                }
            )
        })
        .count();
    assert_eq!(turrets, 2, "one turret behind the plug and one flanking");
    assert!(report.placed >= 3);
}

#[test]
fn opening_builds_layout_and_spends_movement_on_interceptors() {
    let planner = DefensePlanner::default();
    let mut state = TurnState::new(UnitCatalog::standard(), 0, ResourcePool::new(40.0, 5.0));
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let report = planner.opening(&mut state, &mut rng);

    assert_eq!(report.placed, 24);
    assert_eq!(report.interceptors, 5);
    assert_eq!(state.resources(), ResourcePool::new(10.0, 0.0));
    let launch: Vec<Location> = EdgeSide::LAUNCH
        .iter()
        .flat_map(|side| side.locations())
        .collect();
    assert!(state.pending().deploy.iter().all(|action| matches!(
        action,
        Action::Place { kind: UnitKind::Interceptor, location } if launch.contains(location)
    )));
}

#[test]
fn surplus_buys_supports_while_affordable() {
    let planner = DefensePlanner::default();
    let mut state = state(9.0, 0.0);

    let report = planner.invest_surplus(&mut state);

    assert_eq!(report.placed, 2);
    assert_eq!(
        state.occupant(Location::new(14, 9)).map(|unit| unit.kind),
        Some(UnitKind::Support)
    );
    assert_eq!(
        state.occupant(Location::new(4, 11)).map(|unit| unit.kind),
        Some(UnitKind::Support)
    );
    assert_eq!(state.resources().structure(), 1.0);
}
