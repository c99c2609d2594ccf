use leptos::prelude::*;
use medikost_shared::FallbackReason;

const BOX_STYLE: &str = "width: 100%; height: 100%; min-height: 16rem; display: flex; align-items: center; justify-content: center; background: #f3f4f6; border-radius: 8px;";

const SPINNER_KEYFRAMES: &str = "@keyframes map-spin { to { transform: rotate(360deg); } }";
const SPINNER_STYLE: &str = "width: 32px; height: 32px; margin: 0 auto 8px; border-radius: 50%; border: 2px solid transparent; border-bottom-color: #059669; animation: map-spin 0.8s linear infinite;";

/// Placeholder shown in the map area instead of a map.
#[component]
pub fn MapFallback(reason: FallbackReason) -> impl IntoView {
    let icon = match reason {
        FallbackReason::NoCoordinates => view! {
            <svg xmlns="http://www.w3.org/2000/svg" width="48" height="48" viewBox="0 0 24 24" fill="none" stroke="#9ca3af" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" style="display: block; margin: 0 auto 8px;">
                <path d="M20 10c0 6-8 12-8 12s-8-6-8-12a8 8 0 0 1 16 0Z"></path>
                <circle cx="12" cy="10" r="3"></circle>
            </svg>
        }
        .into_any(),
        FallbackReason::NotReady => view! {
            <style>{SPINNER_KEYFRAMES}</style>
            <div class="map-spinner" style=SPINNER_STYLE></div>
        }
        .into_any(),
    };

    view! {
        <div class="map-fallback" style=BOX_STYLE>
            <div style="text-align: center;">
                {icon}
                <p style="margin: 0; color: #4b5563; font-weight: 500;">{reason.title()}</p>
                {reason
                    .detail()
                    .map(|detail| {
                        view! {
                            <p style="margin: 0; font-size: 0.875rem; color: #6b7280;">{detail}</p>
                        }
                    })}
            </div>
        </div>
    }
}
