use frontline_core::{
    spend_while_affordable, ActionRejected, Board, BudgetError, CatalogError, Cost, EdgeSide,
    Location, ResourcePool, StationaryUnit, TurnActions, UnitCatalog, UnitKind, UnitStats,
};
use proptest::prelude::*;

/// Launch pad that accepts every affordable mobile placement.
struct LaunchPad {
    catalog: UnitCatalog,
    pool: ResourcePool,
    placed: u32,
}

impl LaunchPad {
    fn new(catalog: UnitCatalog, movement: f64) -> Self {
        Self {
            catalog,
            pool: ResourcePool::new(0.0, movement),
            placed: 0,
        }
    }
}

impl Board for LaunchPad {
    fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    fn occupant(&self, _location: Location) -> Option<&StationaryUnit> {
        None
    }

    fn path_to_edge(&self, _start: Location, _target: Option<EdgeSide>) -> Option<Vec<Location>> {
        None
    }
}

impl TurnActions for LaunchPad {
    fn turn_number(&self) -> u32 {
        1
    }

    fn resources(&self) -> ResourcePool {
        self.pool
    }

    fn can_place(&self, kind: UnitKind, _location: Location) -> Result<(), ActionRejected> {
        let cost = self.catalog.cost(kind);
        if self.pool.can_afford(&cost) {
            Ok(())
        } else {
            Err(ActionRejected::InsufficientResources {
                resource: kind.resource(),
                needed: cost.of(kind.resource()),
                available: self.pool.get(kind.resource()),
            })
        }
    }

    fn request_place(&mut self, kind: UnitKind, location: Location) -> Result<(), ActionRejected> {
        self.can_place(kind, location)?;
        self.pool.spend(&self.catalog.cost(kind))?;
        self.placed += 1;
        Ok(())
    }

    fn request_upgrade(&mut self, location: Location) -> Result<(), ActionRejected> {
        Err(ActionRejected::Vacant(location))
    }

    fn request_remove(&mut self, location: Location) -> Result<(), ActionRejected> {
        Err(ActionRejected::Vacant(location))
    }
}

fn catalog_with_demolisher_cost(cost: f64) -> Result<UnitCatalog, CatalogError> {
    let standard = UnitCatalog::standard();
    let entries: [UnitStats; 6] = UnitKind::ALL.map(|kind| {
        let mut stats = standard.stats(kind).clone();
        if kind == UnitKind::Demolisher {
            stats.base.cost = Cost::new(0.0, cost);
        }
        stats
    });
    UnitCatalog::new(entries)
}

#[test]
fn unaffordable_unit_commits_nothing() {
    let catalog = catalog_with_demolisher_cost(3.0).expect("valid catalog");
    let mut pad = LaunchPad::new(catalog, 2.0);

    let committed = spend_while_affordable(&mut pad, UnitKind::Demolisher, Location::new(13, 0), None)
        .expect("priced unit");

    assert_eq!(committed, 0);
    assert_eq!(pad.resources().movement(), 2.0);
}

#[test]
fn limit_caps_commitment_below_budget() {
    let mut pad = LaunchPad::new(UnitCatalog::standard(), 9.0);

    let committed = spend_while_affordable(&mut pad, UnitKind::Scout, Location::new(13, 0), Some(4))
        .expect("priced unit");

    assert_eq!(committed, 4);
    assert_eq!(pad.resources().movement(), 5.0);
}

#[test]
fn free_units_are_a_configuration_error() {
    assert_eq!(
        catalog_with_demolisher_cost(0.0),
        Err(CatalogError::ZeroCost(UnitKind::Demolisher))
    );
    assert_eq!(
        ResourcePool::new(0.0, 5.0).affordable_count(&Cost::default()),
        Err(BudgetError::FreeCost)
    );
}

proptest! {
    #[test]
    fn spend_loop_never_exceeds_entry_budget(budget in 0.0f64..200.0, cost in 0.25f64..9.0) {
        let catalog = catalog_with_demolisher_cost(cost).expect("valid catalog");
        let mut pad = LaunchPad::new(catalog, budget);
        let entry = pad.resources().movement();

        let committed = spend_while_affordable(&mut pad, UnitKind::Demolisher, Location::new(14, 0), None)
            .expect("priced unit");

        prop_assert!(f64::from(committed) * cost <= entry + 1e-9);
        prop_assert!(f64::from(committed) <= (entry / cost).floor());
        prop_assert_eq!(committed, pad.placed);
        prop_assert!(pad.resources().movement() < cost + 1e-9);
    }
}
