use crate::types::{FilterSelection, Place, Stage};
use serde::Serialize;
use std::collections::BTreeSet;

// Stages run in cascade order: corridor -> municipality -> info_type ->
// category -> sub_category. An empty selection places no restriction.

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageView {
    pub stage: Stage,
    pub options: BTreeSet<String>,
    // User choices that are still among `options`; this is what filters the rows.
    pub selected: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub stages: Vec<StageView>,
    pub rows: Vec<usize>, // indices into the dataset, in dataset order
}

impl Cascade {
    pub fn stage(&self, stage: Stage) -> &StageView {
        &self.stages[stage.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn places<'a, 's>(&'s self, places: &'a [Place]) -> impl Iterator<Item = &'a Place> + 's
    where
        'a: 's,
    {
        self.rows.iter().filter_map(move |&i| places.get(i))
    }
}

fn passes(place: &Place, selected: &BTreeSet<String>, stage: Stage) -> bool {
    selected.is_empty()
        || place
            .stage_value(stage)
            .is_some_and(|value| selected.contains(value))
}

// Distinct values of `stage` among rows surviving every upstream stage.
pub fn available_options(
    places: &[Place],
    selection: &FilterSelection,
    stage: Stage,
) -> BTreeSet<String> {
    evaluate(places, selection).stages.swap_remove(stage.index()).options
}

pub fn filter_places<'a>(places: &'a [Place], selection: &FilterSelection) -> Vec<&'a Place> {
    let cascade = evaluate(places, selection);
    cascade.places(places).collect()
}

pub fn evaluate(places: &[Place], selection: &FilterSelection) -> Cascade {
    let mut alive: Vec<usize> = (0..places.len()).collect();
    let mut stages = Vec::with_capacity(Stage::ALL.len());

    for stage in Stage::ALL {
        // 1. Options come from the rows left by the upstream stages
        let options: BTreeSet<String> = alive
            .iter()
            .filter_map(|&i| places[i].stage_value(stage))
            .map(str::to_string)
            .collect();

        // 2. Drop choices an upstream change made stale
        let selected: BTreeSet<String> = selection
            .get(stage)
            .intersection(&options)
            .cloned()
            .collect();

        // 3. Narrow the rows with what is left
        alive.retain(|&i| passes(&places[i], &selected, stage));
        stages.push(StageView {
            stage,
            options,
            selected,
        });
    }

    Cascade {
        stages,
        rows: alive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NO_INFO;

    fn place(name: &str, corridor: Option<&str>, municipality: &str, levels: [&str; 3]) -> Place {
        Place {
            name: name.to_string(),
            municipality: municipality.to_string(),
            corridor: corridor.map(String::from),
            info_type: Some(levels[0].to_string()),
            category: Some(levels[1].to_string()),
            sub_category: Some(levels[2].to_string()),
            rating: NO_INFO.to_string(),
            rating_value: None,
            rating_count: 0,
            latitude: Some(4.0),
            longitude: Some(-74.0),
            types: None,
            external_link: None,
        }
    }

    fn sample() -> Vec<Place> {
        vec![
            place("Hotel Sol", Some("North"), "Paipa", ["Services", "Lodging", "Hotel"]),
            place("Hostal Luna", Some("North"), "Paipa", ["Services", "Lodging", "Hostel"]),
            place("Pozo Azul", Some("North"), "Tabio", ["Attractions", "Nature", "Spring"]),
            place("Cafe Rio", Some("South"), "Girardot", ["Services", "Food", "Cafe"]),
            place("Museo", None, "Girardot", ["Attractions", "Culture", "Museum"]),
            place("Sin Dato", Some("South"), NO_INFO, ["Services", "Food", "Restaurant"]),
        ]
    }

    fn names<'a>(rows: impl IntoIterator<Item = &'a Place>) -> Vec<&'a str> {
        rows.into_iter().map(|p| p.name.as_str()).collect()
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let places = sample();
        let selection = FilterSelection::default();

        assert_eq!(filter_places(&places, &selection).len(), places.len());
        let cascade = evaluate(&places, &selection);
        assert_eq!(cascade.rows, (0..places.len()).collect::<Vec<_>>());
        assert_eq!(
            cascade.stage(Stage::Corridor).options,
            set(&["North", "South"])
        );
    }

    #[test]
    fn options_narrow_with_upstream_selection() {
        let places = sample();
        let selection = FilterSelection::default().with(Stage::Corridor, ["North"]);

        assert_eq!(
            available_options(&places, &selection, Stage::Municipality),
            set(&["Paipa", "Tabio"])
        );
        assert_eq!(
            available_options(&places, &selection, Stage::SubCategory),
            set(&["Hostel", "Hotel", "Spring"])
        );
        // A stage's own selection never restricts its own options.
        assert_eq!(
            available_options(&places, &selection, Stage::Corridor),
            set(&["North", "South"])
        );
    }

    #[test]
    fn missing_values_are_not_options() {
        let places = sample();
        let options = available_options(&places, &FilterSelection::default(), Stage::Corridor);
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn rows_without_a_value_fail_a_non_empty_selection() {
        let places = sample();
        let selection = FilterSelection::default().with(Stage::Municipality, ["Girardot"]);
        assert_eq!(names(filter_places(&places, &selection)), ["Cafe Rio", "Museo"]);

        let selection = selection.with(Stage::Corridor, ["South"]);
        assert_eq!(names(filter_places(&places, &selection)), ["Cafe Rio"]);
    }

    #[test]
    fn output_is_conjunction_of_stage_selections() {
        let places = sample();
        let selection = FilterSelection::default()
            .with(Stage::InfoType, ["Services"])
            .with(Stage::Category, ["Lodging", "Food"])
            .with(Stage::SubCategory, ["Hotel", "Cafe", "Spring"]);

        assert_eq!(
            names(filter_places(&places, &selection)),
            ["Hotel Sol", "Cafe Rio"]
        );
    }

    #[test]
    fn rows_are_exactly_those_matching_the_effective_selections() {
        let places = sample();
        let selections = [
            FilterSelection::default(),
            FilterSelection::default().with(Stage::Corridor, ["North"]),
            FilterSelection::default()
                .with(Stage::Corridor, ["South"])
                .with(Stage::Category, ["Food"]),
            FilterSelection::default().with(Stage::SubCategory, ["Museum", "Hotel"]),
            FilterSelection::default()
                .with(Stage::Corridor, ["North"])
                .with(Stage::Municipality, ["Girardot"])
                .with(Stage::Category, ["Lodging"]),
        ];

        for selection in &selections {
            let cascade = evaluate(&places, selection);
            let expected: Vec<usize> = (0..places.len())
                .filter(|&i| {
                    cascade
                        .stages
                        .iter()
                        .all(|view| passes(&places[i], &view.selected, view.stage))
                })
                .collect();
            assert_eq!(cascade.rows, expected, "{:?}", selection);
            assert_eq!(
                names(filter_places(&places, selection)),
                names(cascade.places(&places))
            );
        }
    }

    #[test]
    fn stale_downstream_choices_drop_out_of_effective_selection() {
        let places = sample();
        // Hotel was chosen, then the corridor changed to South.
        let selection = FilterSelection::default()
            .with(Stage::Corridor, ["South"])
            .with(Stage::SubCategory, ["Hotel", "Cafe"]);

        let cascade = evaluate(&places, &selection);
        assert_eq!(cascade.stage(Stage::SubCategory).selected, set(&["Cafe"]));
        assert_eq!(names(cascade.places(&places)), ["Cafe Rio"]);
    }

    #[test]
    fn stage_whose_only_choice_went_stale_stops_restricting() {
        let places = sample();
        let selection = FilterSelection::default()
            .with(Stage::Corridor, ["South"])
            .with(Stage::SubCategory, ["Hotel"]);

        let cascade = evaluate(&places, &selection);
        let sub = cascade.stage(Stage::SubCategory);
        assert!(sub.selected.is_empty());
        assert_eq!(sub.options, set(&["Cafe", "Restaurant"]));
        assert_eq!(names(cascade.places(&places)), ["Cafe Rio", "Sin Dato"]);

        // Rows agree with re-running on the effective selections alone.
        let effective = FilterSelection::default().with(Stage::Corridor, ["South"]);
        assert_eq!(cascade.rows, evaluate(&places, &effective).rows);
    }

    #[test]
    fn stale_middle_stage_leaves_downstream_options_from_upstream_rows() {
        let places = sample();
        let selection = FilterSelection::default()
            .with(Stage::Corridor, ["North"])
            .with(Stage::Municipality, ["Girardot"]);

        let cascade = evaluate(&places, &selection);
        assert!(cascade.stage(Stage::Municipality).selected.is_empty());
        assert_eq!(
            cascade.stage(Stage::Category).options,
            set(&["Lodging", "Nature"])
        );
        assert_eq!(cascade.len(), 3);
    }

    #[test]
    fn effective_selections_are_subsets_of_their_options() {
        let places = sample();
        let selection = FilterSelection::default()
            .with(Stage::Corridor, ["North", "Nowhere"])
            .with(Stage::Municipality, ["Girardot", "Tabio"])
            .with(Stage::SubCategory, ["Spring", "Hotel"]);

        let cascade = evaluate(&places, &selection);
        for view in &cascade.stages {
            assert!(view.selected.is_subset(&view.options), "{:?}", view.stage);
        }
        assert_eq!(names(cascade.places(&places)), ["Pozo Azul"]);
    }

    #[test]
    fn places_skips_indices_outside_the_slice() {
        let places = sample();
        let cascade = evaluate(&places, &FilterSelection::default());
        assert_eq!(cascade.places(&places[..2]).count(), 2);
    }

    #[test]
    fn empty_dataset_is_an_empty_result_not_an_error() {
        let selection = FilterSelection::default().with(Stage::Corridor, ["North"]);

        let cascade = evaluate(&[], &selection);
        assert!(cascade.is_empty());
        assert_eq!(cascade.stages.len(), Stage::ALL.len());
        assert!(cascade.stage(Stage::Corridor).options.is_empty());
        assert!(cascade.stage(Stage::Corridor).selected.is_empty());
    }

    #[test]
    fn every_selection_combination_is_well_defined() {
        let places = sample();
        let corridors = [set(&[]), set(&["North"]), set(&["South"]), set(&["North", "South"])];
        let categories = [set(&[]), set(&["Lodging"]), set(&["Food", "Culture"])];

        for corridor in &corridors {
            for category in &categories {
                let selection = FilterSelection {
                    corridor: corridor.clone(),
                    category: category.clone(),
                    ..Default::default()
                };
                let cascade = evaluate(&places, &selection);
                assert!(cascade.len() <= places.len());

                let corridor = &cascade.stage(Stage::Corridor).selected;
                let category = &cascade.stage(Stage::Category).selected;
                for place in cascade.places(&places) {
                    assert!(corridor.is_empty() || corridor.contains(place.corridor.as_deref().unwrap()));
                    assert!(category.is_empty() || category.contains(place.category.as_deref().unwrap()));
                }
            }
        }
    }

    #[test]
    fn widening_upstream_never_shrinks_options() {
        let places = sample();
        let upstream = [
            (set(&["North"]), set(&["North", "South"])),
            (set(&["South"]), set(&["North", "South"])),
            (set(&["North", "South"]), set(&[])),
        ];

        for (narrow, wide) in upstream {
            let narrow_sel = FilterSelection {
                corridor: narrow,
                ..Default::default()
            };
            let wide_sel = FilterSelection {
                corridor: wide,
                ..Default::default()
            };
            for stage in &Stage::ALL[1..] {
                let narrow_opts = available_options(&places, &narrow_sel, *stage);
                let wide_opts = available_options(&places, &wide_sel, *stage);
                assert!(narrow_opts.is_subset(&wide_opts), "{:?}", stage);
            }
        }
    }

    #[test]
    fn scenario_corridor_keeps_row_without_coordinates() {
        let mut a = place("A", Some("C1"), "M1", ["i", "c", "X"]);
        a.rating = "4.5".into();
        let mut b = place("B", Some("C1"), "M2", ["i", "c", "Y"]);
        b.latitude = None;

        let places = vec![a, b];
        let selection = FilterSelection::default().with(Stage::Corridor, ["C1"]);
        assert_eq!(names(filter_places(&places, &selection)), ["A", "B"]);
    }
}
