use leptos::prelude::*;
use medikost_shared::{Location, ProductDetail, REFERENCE_LABEL};

use crate::api;
use crate::map::KostMap;

#[derive(Debug, Clone, PartialEq)]
enum ListingState {
    Loading,
    Loaded(ProductDetail),
    Failed(String),
}

fn current_listing_id() -> Option<u64> {
    let location = web_sys::window()?.location();
    let path = location.pathname().ok()?;
    let search = location.search().unwrap_or_default();
    api::listing_id(&path, &search)
}

/// Listing detail page: headline facts and the map to the hospital.
#[component]
pub fn App() -> impl IntoView {
    let state = RwSignal::new(ListingState::Loading);

    match current_listing_id() {
        Some(id) => {
            wasm_bindgen_futures::spawn_local(async move {
                match api::fetch_product(id).await {
                    Ok(product) => {
                        tracing::info!(id, name = %product.name, "listing loaded");
                        state.set(ListingState::Loaded(product));
                    }
                    Err(e) => {
                        tracing::warn!(id, error = %e, "listing fetch failed");
                        state.set(ListingState::Failed(e));
                    }
                }
            });
        }
        None => state.set(ListingState::Failed("Kos tidak ditemukan".to_string())),
    }

    let location = Memo::new(move |_| {
        state.with(|s| match s {
            ListingState::Loaded(product) => product.location(),
            _ => Location::default(),
        })
    });
    let loaded = Memo::new(move |_| state.with(|s| matches!(s, ListingState::Loaded(_))));

    view! {
        <main style="max-width: 960px; margin: 0 auto; padding: 24px 16px; font-family: system-ui, sans-serif; color: #111827;">
            {move || match state.get() {
                ListingState::Loading => {
                    view! { <p style="color: #6b7280;">"Memuat data kos..."</p> }.into_any()
                }
                ListingState::Failed(message) => {
                    view! { <p style="color: #b91c1c;">{message}</p> }.into_any()
                }
                ListingState::Loaded(product) => view! { <ListingSummary product=product /> }.into_any(),
            }}
            <Show when=move || loaded.get()>
                <section style="margin-top: 24px;">
                    <h2 style="font-size: 1.125rem; margin: 0 0 12px;">"Lokasi"</h2>
                    <KostMap location=location />
                </section>
            </Show>
        </main>
    }
}

#[component]
fn ListingSummary(product: ProductDetail) -> impl IntoView {
    let distance = product
        .distance_to_kariadi
        .map(|km| format!("{km:.1} km ke {REFERENCE_LABEL}"));
    let price = product
        .starting_price
        .map(|price| format!("Mulai Rp {}", group_thousands(price.round() as u64)));

    view! {
        <header>
            <h1 style="font-size: 1.5rem; margin: 0 0 4px;">{product.name}</h1>
            <p style="margin: 0; color: #4b5563;">{product.address}</p>
            {distance.map(|d| view! { <p style="margin: 4px 0 0; color: #059669;">{d}</p> })}
            {price.map(|p| view! { <p style="margin: 4px 0 0; font-weight: 600;">{p}</p> })}
        </header>
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_thousands_uses_dot_separators() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(950), "950");
        assert_eq!(group_thousands(1_500_000), "1.500.000");
        assert_eq!(group_thousands(12_345), "12.345");
    }
}
