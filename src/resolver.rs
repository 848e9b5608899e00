use serde::Serialize;
use tracing::{debug, warn};

use crate::candidates::{Candidate, CandidateKind, CandidateList};
use crate::errors::AppResult;
use crate::location::{Axis, Level, Location};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DropdownState {
    #[default]
    Closed,
    Open,
    CustomEntry { text: String },
}

impl DropdownState {
    pub fn is_open(&self) -> bool {
        matches!(self, DropdownState::Open)
    }

    pub fn is_custom_entry(&self) -> bool {
        matches!(self, DropdownState::CustomEntry { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomKey {
    Enter,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub level: Level,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Countries,
    Regions {
        country: String,
    },
    Cities {
        country: String,
        region: String,
    },
    Towns {
        country: String,
        region: String,
        city: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetch {
    pub ticket: Ticket,
    pub request: FetchRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverEffect {
    LocationChanged(Location),
    Fetch(Fetch),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelView {
    pub level: Level,
    pub label: String,
    pub dropdown: DropdownState,
    pub candidates: Vec<CandidateView>,
    pub empty_hint: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub id: String,
    pub name: String,
    pub parent_context: String,
    pub kind: CandidateKind,
    pub badge: String,
}

#[derive(Debug, Clone, Default)]
struct LevelSlot {
    dropdown: DropdownState,
    fetched: Vec<String>,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    location: Location,
    slots: [LevelSlot; 4],
    search_term: String,
    in_flight: usize,
}

impl LocationResolver {
    pub fn mount(location: Location) -> (Self, Vec<ResolverEffect>) {
        let mut resolver = Self {
            location: Location::default(),
            slots: Default::default(),
            search_term: String::new(),
            in_flight: 0,
        };
        let mut effects = vec![resolver.dispatch(Level::Country, FetchRequest::Countries)];
        effects.extend(resolver.apply(location, false));
        (resolver, effects)
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn dropdown(&self, level: Level) -> &DropdownState {
        &self.slot(level).dropdown
    }

    pub fn button_label(&self, level: Level) -> &str {
        let value = self.location.get(level);
        if value.is_empty() {
            level.placeholder()
        } else {
            value
        }
    }

    pub fn candidates(&self, level: Level) -> CandidateList {
        CandidateList::build(
            level,
            &self.slot(level).fetched,
            &self.location,
            &self.search_term,
        )
    }

    pub fn level_view(&self, level: Level) -> LevelView {
        let candidates = self.candidates(level);
        LevelView {
            level,
            label: self.button_label(level).to_string(),
            dropdown: self.dropdown(level).clone(),
            candidates: candidates
                .entries()
                .iter()
                .map(|candidate| CandidateView {
                    id: candidate.id.clone(),
                    name: candidate.name.clone(),
                    parent_context: candidate.parent_context.clone(),
                    kind: candidate.kind,
                    badge: candidate.badge(level),
                })
                .collect(),
            empty_hint: candidates.empty_hint(),
        }
    }

    pub fn toggle_dropdown(&mut self, level: Level) {
        if self.slot(level).dropdown.is_custom_entry() {
            return;
        }
        let was_open = self.slot(level).dropdown.is_open();
        self.close_open_dropdowns();
        if !was_open {
            self.slot_mut(level).dropdown = DropdownState::Open;
        }
    }

    pub fn click_outside(&mut self) {
        self.close_open_dropdowns();
    }

    pub fn escape(&mut self) {
        self.close_open_dropdowns();
    }

    pub fn select_country(&mut self, name: &str) -> Vec<ResolverEffect> {
        let next = self.location.with_level(Level::Country, name);
        self.slot_mut(Level::Country).dropdown = DropdownState::Closed;
        for level in Level::DEPENDENT {
            if self.slot(level).dropdown.is_custom_entry() {
                self.slot_mut(level).dropdown = DropdownState::Closed;
            }
        }
        self.apply(next, true)
    }

    pub fn select_region(&mut self, candidate: &Candidate) -> Vec<ResolverEffect> {
        self.select_candidate(Level::Region, candidate)
    }

    pub fn select_city(&mut self, candidate: &Candidate) -> Vec<ResolverEffect> {
        self.select_candidate(Level::City, candidate)
    }

    pub fn select_town(&mut self, candidate: &Candidate) -> Vec<ResolverEffect> {
        self.select_candidate(Level::Town, candidate)
    }

    pub fn select_candidate(&mut self, level: Level, candidate: &Candidate) -> Vec<ResolverEffect> {
        if level == Level::Country {
            return self.select_country(&candidate.name);
        }
        if candidate.is_custom_option() {
            self.slot_mut(level).dropdown = DropdownState::CustomEntry {
                text: String::new(),
            };
            return Vec::new();
        }
        let next = self.location.with_level(level, candidate.name.as_str());
        self.slot_mut(level).dropdown = DropdownState::Closed;
        self.apply(next, true)
    }

    pub fn edit_custom(&mut self, level: Level, text: &str) {
        if let DropdownState::CustomEntry { text: buffer } = &mut self.slot_mut(level).dropdown {
            *buffer = text.to_string();
        }
    }

    pub fn custom_key(&mut self, level: Level, key: CustomKey) -> Vec<ResolverEffect> {
        let Some(text) = self.custom_buffer(level) else {
            return Vec::new();
        };
        match key {
            CustomKey::Enter if text.trim().is_empty() => Vec::new(),
            CustomKey::Enter => self.commit_custom_value(level, &text),
            CustomKey::Escape => {
                self.slot_mut(level).dropdown = DropdownState::Closed;
                Vec::new()
            }
        }
    }

    pub fn blur_custom(&mut self, level: Level) -> Vec<ResolverEffect> {
        match self.custom_buffer(level) {
            Some(text) => self.commit_custom_value(level, &text),
            None => Vec::new(),
        }
    }

    pub fn cancel_custom(&mut self, level: Level) {
        if self.slot(level).dropdown.is_custom_entry() {
            self.slot_mut(level).dropdown = DropdownState::Closed;
        }
    }

    pub fn commit_custom_value(&mut self, level: Level, text: &str) -> Vec<ResolverEffect> {
        if !level.accepts_custom() {
            debug!(%level, "ignoring custom value for a level without free-text entry");
            return Vec::new();
        }
        self.slot_mut(level).dropdown = DropdownState::Closed;
        let value = text.trim();
        if value.is_empty() {
            return Vec::new();
        }
        if level == Level::Region {
            // Invalidate whatever the previous region's city lookup returns.
            let city = self.slot_mut(Level::City);
            city.fetched.clear();
            city.generation += 1;
        }
        let next = self.location.with_level(level, value);
        self.apply(next, true)
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search_term = term.to_string();
    }

    pub fn set_gps_field(&mut self, axis: Axis, text: &str) -> Vec<ResolverEffect> {
        let next = self.location.with_gps_field(axis, text);
        self.apply(next, true)
    }

    pub fn location_updated(&mut self, location: Location) -> Vec<ResolverEffect> {
        self.apply(location, false)
    }

    pub fn fetch_resolved(&mut self, ticket: Ticket, result: AppResult<Vec<String>>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.slot(ticket.level).generation != ticket.generation {
            debug!(
                level = %ticket.level,
                generation = ticket.generation,
                current = self.slot(ticket.level).generation,
                "discarding stale lookup response"
            );
            return;
        }
        let names = match result {
            Ok(names) => names,
            Err(err) => {
                warn!(?err, level = %ticket.level, "lookup failed; showing an empty list");
                Vec::new()
            }
        };
        self.slot_mut(ticket.level).fetched = names;
    }

    pub fn abandon_lookups(&mut self) {
        self.in_flight = 0;
        for slot in &mut self.slots {
            slot.generation += 1;
        }
    }

    fn apply(&mut self, next: Location, notify: bool) -> Vec<ResolverEffect> {
        let previous = std::mem::replace(&mut self.location, next.clone());
        let mut effects = Vec::new();
        if notify && previous != next {
            effects.push(ResolverEffect::LocationChanged(next.clone()));
        }

        let country_changed = previous.country != next.country;
        let region_changed = country_changed || previous.region != next.region;
        let city_changed = region_changed || previous.city != next.city;

        if country_changed {
            self.reset(Level::Region);
            if !next.country.is_empty() {
                effects.push(self.dispatch(
                    Level::Region,
                    FetchRequest::Regions {
                        country: next.country.clone(),
                    },
                ));
            }
        }
        if region_changed {
            self.reset(Level::City);
            if !next.country.is_empty() && !next.region.is_empty() {
                effects.push(self.dispatch(
                    Level::City,
                    FetchRequest::Cities {
                        country: next.country.clone(),
                        region: next.region.clone(),
                    },
                ));
            }
        }
        if city_changed {
            self.reset(Level::Town);
            if !next.city.is_empty() {
                effects.push(self.dispatch(
                    Level::Town,
                    FetchRequest::Towns {
                        country: next.country.clone(),
                        region: next.region.clone(),
                        city: next.city.clone(),
                    },
                ));
            }
        }
        effects
    }

    fn dispatch(&mut self, level: Level, request: FetchRequest) -> ResolverEffect {
        let slot = self.slot_mut(level);
        slot.generation += 1;
        let ticket = Ticket {
            level,
            generation: slot.generation,
        };
        self.in_flight += 1;
        ResolverEffect::Fetch(Fetch { ticket, request })
    }

    fn reset(&mut self, level: Level) {
        let slot = self.slot_mut(level);
        slot.fetched.clear();
        slot.generation += 1;
    }

    fn close_open_dropdowns(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.dropdown.is_open() {
                slot.dropdown = DropdownState::Closed;
            }
        }
    }

    fn custom_buffer(&self, level: Level) -> Option<String> {
        match &self.slot(level).dropdown {
            DropdownState::CustomEntry { text } => Some(text.clone()),
            _ => None,
        }
    }

    fn slot(&self, level: Level) -> &LevelSlot {
        &self.slots[level.index()]
    }

    fn slot_mut(&mut self, level: Level) -> &mut LevelSlot {
        &mut self.slots[level.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::CUSTOM_OPTION;
    use crate::errors::AppError;
    use crate::location::GpsCoordinates;

    fn fetches(effects: &[ResolverEffect]) -> Vec<Fetch> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                ResolverEffect::Fetch(fetch) => Some(fetch.clone()),
                _ => None,
            })
            .collect()
    }

    fn proposed(effects: &[ResolverEffect]) -> Vec<Location> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                ResolverEffect::LocationChanged(location) => Some(location.clone()),
                _ => None,
            })
            .collect()
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn resolve(resolver: &mut LocationResolver, fetch: &Fetch, values: &[&str]) {
        resolver.fetch_resolved(fetch.ticket, Ok(names(values)));
    }

    fn seeded() -> Location {
        Location {
            country: "Ghana".into(),
            region: "Greater Accra".into(),
            city: "Accra".into(),
            town: "Osu".into(),
            gps_coordinates: GpsCoordinates::new("5.56", "-0.2"),
        }
    }

    #[test]
    fn mount_fetches_countries_and_seeded_levels() {
        let (resolver, effects) = LocationResolver::mount(seeded());
        let requests = fetches(&effects)
            .into_iter()
            .map(|f| f.request)
            .collect::<Vec<_>>();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0], FetchRequest::Countries);
        assert!(matches!(requests[1], FetchRequest::Regions { .. }));
        assert!(matches!(requests[2], FetchRequest::Cities { .. }));
        assert!(matches!(requests[3], FetchRequest::Towns { .. }));
        assert!(proposed(&effects).is_empty());
        assert!(resolver.is_loading());

        let (_, effects) = LocationResolver::mount(Location::default());
        assert_eq!(fetches(&effects).len(), 1);
    }

    #[test]
    fn select_country_clears_children_and_fetches_regions() {
        let (mut resolver, _) = LocationResolver::mount(seeded());
        let effects = resolver.select_country("Togo");

        let proposals = proposed(&effects);
        assert_eq!(proposals.len(), 1);
        let next = &proposals[0];
        assert_eq!(next.country, "Togo");
        assert_eq!((next.region.as_str(), next.city.as_str(), next.town.as_str()), ("", "", ""));
        assert_eq!(next.gps_coordinates, seeded().gps_coordinates);

        let requests = fetches(&effects);
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].request,
            FetchRequest::Regions {
                country: "Togo".into()
            }
        );
    }

    #[test]
    fn select_region_only_clears_its_descendants() {
        let (mut resolver, _) = LocationResolver::mount(seeded());
        let effects = resolver.select_region(&Candidate::named("Ashanti"));
        let next = &proposed(&effects)[0];
        assert_eq!(next.country, "Ghana");
        assert_eq!(next.region, "Ashanti");
        assert_eq!(next.city, "");
        assert_eq!(next.town, "");
        assert!(matches!(
            fetches(&effects)[0].request,
            FetchRequest::Cities { .. }
        ));

        let effects = resolver.select_city(&Candidate::named("Kumasi"));
        let next = &proposed(&effects)[0];
        assert_eq!(next.region, "Ashanti");
        assert_eq!(next.city, "Kumasi");
        assert!(matches!(
            fetches(&effects)[0].request,
            FetchRequest::Towns { .. }
        ));
    }

    #[test]
    fn sentinel_opens_custom_entry_without_writing() {
        let (mut resolver, _) = LocationResolver::mount(seeded());
        resolver.toggle_dropdown(Level::Region);
        let sentinel = resolver
            .candidates(Level::Region)
            .find(CUSTOM_OPTION)
            .cloned()
            .unwrap();
        let effects = resolver.select_region(&sentinel);
        assert!(effects.is_empty());
        assert!(resolver.dropdown(Level::Region).is_custom_entry());
        assert_eq!(resolver.location(), &seeded());
    }

    #[test]
    fn sentinel_chosen_by_name_still_opens_custom_entry() {
        let (mut resolver, _) = LocationResolver::mount(seeded());
        let view = resolver.level_view(Level::Region);
        let last = view.candidates.last().unwrap();
        assert_eq!(last.kind, CandidateKind::Custom);

        let effects = resolver.select_region(&Candidate::named(last.name.clone()));
        assert!(effects.is_empty());
        assert!(resolver.dropdown(Level::Region).is_custom_entry());
        assert_eq!(resolver.location().region, seeded().region);
    }

    #[test]
    fn custom_commit_trims_and_blank_is_ignored() {
        let (mut resolver, _) = LocationResolver::mount(Location {
            country: "Ghana".into(),
            ..Location::default()
        });

        let effects = resolver.commit_custom_value(Level::Region, "   ");
        assert!(effects.is_empty());
        assert_eq!(resolver.location().region, "");

        resolver.select_region(&Candidate::custom_option(Level::Region, "Ghana"));
        resolver.edit_custom(Level::Region, "  Foo  ");
        let effects = resolver.custom_key(Level::Region, CustomKey::Enter);
        assert_eq!(proposed(&effects)[0].region, "Foo");
        assert_eq!(resolver.location().region, "Foo");
        assert_eq!(resolver.dropdown(Level::Region), &DropdownState::Closed);
    }

    #[test]
    fn custom_entry_keys_and_blur() {
        let (mut resolver, _) = LocationResolver::mount(seeded());
        let sentinel = Candidate::custom_option(Level::Town, "");

        resolver.select_town(&sentinel);
        resolver.edit_custom(Level::Town, "  ");
        assert!(resolver.custom_key(Level::Town, CustomKey::Enter).is_empty());
        assert!(resolver.dropdown(Level::Town).is_custom_entry());

        resolver.edit_custom(Level::Town, "Labadi");
        resolver.custom_key(Level::Town, CustomKey::Escape);
        assert_eq!(resolver.dropdown(Level::Town), &DropdownState::Closed);
        assert_eq!(resolver.location().town, "Osu");

        resolver.select_town(&sentinel);
        resolver.edit_custom(Level::Town, "Labadi");
        resolver.cancel_custom(Level::Town);
        assert_eq!(resolver.location().town, "Osu");

        resolver.select_town(&sentinel);
        resolver.edit_custom(Level::Town, " Labadi ");
        let effects = resolver.blur_custom(Level::Town);
        assert_eq!(proposed(&effects)[0].town, "Labadi");

        resolver.select_town(&sentinel);
        assert!(resolver.blur_custom(Level::Town).is_empty());
        assert_eq!(resolver.dropdown(Level::Town), &DropdownState::Closed);
    }

    #[test]
    fn custom_region_commit_drops_stale_city_candidates() {
        let (mut resolver, effects) = LocationResolver::mount(Location {
            country: "Ghana".into(),
            region: "Ashanti".into(),
            ..Location::default()
        });
        let city_fetch = fetches(&effects)
            .into_iter()
            .find(|f| f.ticket.level == Level::City)
            .unwrap();

        let effects = resolver.commit_custom_value(Level::Region, "New Region");
        resolve(&mut resolver, &city_fetch, &["Kumasi"]);
        assert!(!resolver.candidates(Level::City).has_matches());

        let fresh = fetches(&effects)
            .into_iter()
            .find(|f| f.ticket.level == Level::City)
            .unwrap();
        assert_eq!(
            fresh.request,
            FetchRequest::Cities {
                country: "Ghana".into(),
                region: "New Region".into()
            }
        );
    }

    #[test]
    fn stale_region_response_is_discarded() {
        let (mut resolver, _) = LocationResolver::mount(Location::default());
        let first = fetches(&resolver.select_country("Ghana"))[0].clone();
        let second = fetches(&resolver.select_country("Togo"))[0].clone();

        resolve(&mut resolver, &second, &["Maritime", "Plateaux"]);
        resolve(&mut resolver, &first, &["Ashanti", "Greater Accra"]);

        assert_eq!(
            resolver.candidates(Level::Region).names(),
            vec!["Maritime", "Plateaux", CUSTOM_OPTION]
        );
    }

    #[test]
    fn loading_tracks_every_dispatched_lookup() {
        let (mut resolver, effects) = LocationResolver::mount(Location::default());
        let countries = fetches(&effects)[0].clone();
        let regions = fetches(&resolver.select_country("Ghana"))[0].clone();
        assert!(resolver.is_loading());

        resolver.fetch_resolved(countries.ticket, Ok(names(&["Ghana", "Togo"])));
        assert!(resolver.is_loading());
        resolver.fetch_resolved(
            regions.ticket,
            Err(AppError::Lookup("service unavailable".into())),
        );
        assert!(!resolver.is_loading());
        assert_eq!(resolver.candidates(Level::Region).names(), vec![CUSTOM_OPTION]);
    }

    #[test]
    fn abandoned_lookups_stop_loading_and_are_ignored() {
        let (mut resolver, effects) = LocationResolver::mount(Location::default());
        let countries = fetches(&effects)[0].clone();
        assert!(resolver.is_loading());

        resolver.abandon_lookups();
        assert!(!resolver.is_loading());
        resolver.fetch_resolved(countries.ticket, Ok(names(&["Ghana"])));
        assert!(resolver.candidates(Level::Country).is_empty());
        assert!(!resolver.is_loading());
    }

    #[test]
    fn dropdowns_open_one_at_a_time_and_close_on_outside_click() {
        let (mut resolver, _) = LocationResolver::mount(Location::default());
        resolver.toggle_dropdown(Level::Country);
        assert!(resolver.dropdown(Level::Country).is_open());

        resolver.toggle_dropdown(Level::City);
        assert!(!resolver.dropdown(Level::Country).is_open());
        assert!(resolver.dropdown(Level::City).is_open());

        resolver.select_town(&Candidate::custom_option(Level::Town, ""));
        resolver.click_outside();
        assert_eq!(resolver.dropdown(Level::City), &DropdownState::Closed);
        assert!(resolver.dropdown(Level::Town).is_custom_entry());

        resolver.toggle_dropdown(Level::Region);
        resolver.escape();
        assert_eq!(resolver.dropdown(Level::Region), &DropdownState::Closed);
    }

    #[test]
    fn select_country_closes_custom_boxes() {
        let (mut resolver, _) = LocationResolver::mount(seeded());
        resolver.select_city(&Candidate::custom_option(Level::City, ""));
        resolver.toggle_dropdown(Level::Country);
        resolver.select_country("Ghana");
        assert_eq!(resolver.dropdown(Level::City), &DropdownState::Closed);
        assert_eq!(resolver.dropdown(Level::Country), &DropdownState::Closed);
        assert_eq!(resolver.location().region, "");
    }

    #[test]
    fn search_term_filters_every_level_and_blank_restores() {
        let (mut resolver, effects) = LocationResolver::mount(Location::default());
        let countries = fetches(&effects)[0].clone();
        resolve(&mut resolver, &countries, &["Ghana", "Togo", "Germany"]);
        let regions = fetches(&resolver.select_country("Ghana"))[0].clone();
        resolve(&mut resolver, &regions, &["Ashanti", "Greater Accra"]);

        resolver.set_search_term("gh");
        assert_eq!(resolver.candidates(Level::Country).names(), vec!["Ghana"]);
        assert_eq!(resolver.candidates(Level::Region).names(), vec![CUSTOM_OPTION]);

        resolver.set_search_term("");
        assert_eq!(
            resolver.candidates(Level::Country).names(),
            vec!["Ghana", "Togo", "Germany"]
        );
        assert_eq!(
            resolver.candidates(Level::Region).names(),
            vec!["Ashanti", "Greater Accra", CUSTOM_OPTION]
        );
    }

    #[test]
    fn gps_fields_do_not_touch_names_or_trigger_lookups() {
        let (mut resolver, _) = LocationResolver::mount(seeded());
        let effects = resolver.set_gps_field(Axis::Lat, "not a number");
        assert!(fetches(&effects).is_empty());
        let next = &proposed(&effects)[0];
        assert_eq!(next.gps_coordinates.lat, "not a number");
        assert_eq!(next.city, "Accra");
    }

    #[test]
    fn parent_updates_are_not_echoed() {
        let (mut resolver, _) = LocationResolver::mount(Location::default());
        let effects = resolver.location_updated(seeded());
        assert!(proposed(&effects).is_empty());
        assert_eq!(fetches(&effects).len(), 3);
        assert!(resolver.location_updated(seeded()).is_empty());
    }

    #[test]
    fn level_view_carries_badges_and_hints() {
        let (mut resolver, _) = LocationResolver::mount(Location {
            country: "Ghana".into(),
            region: "Volta Custom".into(),
            ..Location::default()
        });
        resolver.toggle_dropdown(Level::Region);
        let view = resolver.level_view(Level::Region);
        assert_eq!(view.label, "Volta Custom");
        assert!(view.dropdown.is_open());
        assert_eq!(view.candidates[0].badge, "Current Region");
        assert_eq!(view.candidates[1].name, CUSTOM_OPTION);
        assert_eq!(view.empty_hint, None);

        let city = resolver.level_view(Level::City);
        assert_eq!(city.label, "Select City");
        assert_eq!(city.empty_hint, Some(crate::candidates::EMPTY_HINT));
    }

    #[test]
    fn button_labels_fall_back_to_placeholders() {
        let (resolver, _) = LocationResolver::mount(Location {
            country: "Ghana".into(),
            ..Location::default()
        });
        assert_eq!(resolver.button_label(Level::Country), "Ghana");
        assert_eq!(resolver.button_label(Level::Region), "Select Region");
    }

    #[test]
    fn full_cascade_produces_the_expected_location() {
        let (mut resolver, effects) = LocationResolver::mount(Location::default());
        let countries = fetches(&effects)[0].clone();
        resolve(&mut resolver, &countries, &["Ghana", "Togo"]);

        let regions = fetches(&resolver.select_country("Ghana"))[0].clone();
        resolve(&mut resolver, &regions, &["Ashanti", "Greater Accra"]);

        let region = resolver
            .candidates(Level::Region)
            .find("Greater Accra")
            .cloned()
            .unwrap();
        let cities = fetches(&resolver.select_region(&region))[0].clone();
        resolve(&mut resolver, &cities, &["Accra", "Tema"]);

        let city = resolver
            .candidates(Level::City)
            .find("Accra")
            .cloned()
            .unwrap();
        let effects = resolver.select_city(&city);
        let towns = fetches(&effects)[0].clone();
        resolve(&mut resolver, &towns, &[]);

        assert_eq!(
            resolver.location(),
            &Location {
                country: "Ghana".into(),
                region: "Greater Accra".into(),
                city: "Accra".into(),
                town: String::new(),
                gps_coordinates: GpsCoordinates::default(),
            }
        );
        assert!(!resolver.is_loading());
    }
}
