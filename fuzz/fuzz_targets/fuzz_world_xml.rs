#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data) {
        if let Ok(document) = stationeers_map_data::parse_world_document(xml) {
            // Auswahl darf bei beliebigem Inhalt nur Fehler liefern, nie paniken
            let _ = stationeers_map_data::world::select_layers(&document);
            let _ = stationeers_map_data::world::start_locations(&document.start_locations);
        }
    }
});
