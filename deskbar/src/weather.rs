//! Weather indicator

use gtk4::prelude::*;
use gtk4::{self, Orientation};
use std::rc::Rc;

use deskbar_core::services::WeatherService;

/// Icon for a weather condition group
#[must_use]
pub fn weather_icon_name(group: &str) -> &'static str {
    match group {
        "Clear-Day" => "weather-clear-symbolic",
        "Clear-Night" => "weather-clear-night-symbolic",
        "Clouds" => "weather-overcast-symbolic",
        "Rain" | "Drizzle" => "weather-showers-symbolic",
        "Thunderstorm" => "weather-storm-symbolic",
        "Snow" => "weather-snow-symbolic",
        "Mist" | "Fog" | "Haze" | "Smoke" | "Dust" | "Sand" | "Ash" => "weather-fog-symbolic",
        _ => "weather-severe-alert-symbolic",
    }
}

/// Temperature as shown in the bar
#[must_use]
pub fn temperature_text(temperature: f64) -> String {
    format!("{temperature:.0}°")
}

/// Icon and temperature, hidden until a fetch succeeds
pub struct WeatherIndicator {
    container: gtk4::Box,
}

impl WeatherIndicator {
    /// Creates the indicator bound to `weather`
    #[must_use]
    pub fn new(weather: &Rc<WeatherService>) -> Self {
        let container = gtk4::Box::builder()
            .orientation(Orientation::Horizontal)
            .spacing(4)
            .css_classes(["weather"])
            .visible(false)
            .build();
        let icon = gtk4::Image::from_icon_name("weather-severe-alert-symbolic");
        let label = gtk4::Label::builder().css_classes(["caption"]).build();
        container.append(&icon);
        container.append(&label);

        let update: Rc<dyn Fn()> = {
            let container = container.downgrade();
            let icon = icon.downgrade();
            let label = label.downgrade();
            let weather = Rc::downgrade(weather);
            Rc::new(move || {
                let (Some(container), Some(icon), Some(label), Some(weather)) = (
                    container.upgrade(),
                    icon.upgrade(),
                    label.upgrade(),
                    weather.upgrade(),
                ) else {
                    return;
                };
                let ok = weather.status.get();
                container.set_visible(ok);
                if ok {
                    icon.set_icon_name(Some(weather.group.with(|g| weather_icon_name(g))));
                    label.set_text(&temperature_text(weather.temperature.get()));
                    container.set_tooltip_text(Some(&weather.description.get()));
                }
            })
        };

        let u = Rc::clone(&update);
        weather.status.connect_notify(move |_| u());
        let u = Rc::clone(&update);
        weather.group.connect_notify(move |_| u());
        let u = Rc::clone(&update);
        weather.temperature.connect_notify(move |_| u());
        let u = Rc::clone(&update);
        weather.description.connect_notify(move |_| u());
        update();

        Self { container }
    }

    /// Root widget
    #[must_use]
    pub fn widget(&self) -> &gtk4::Box {
        &self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_sky_has_day_and_night_icons() {
        assert_eq!(weather_icon_name("Clear-Day"), "weather-clear-symbolic");
        assert_eq!(weather_icon_name("Clear-Night"), "weather-clear-night-symbolic");
        assert_eq!(weather_icon_name("Drizzle"), weather_icon_name("Rain"));
        assert_eq!(weather_icon_name("Tornado"), "weather-severe-alert-symbolic");
    }

    #[test]
    fn test_temperature_is_rounded() {
        assert_eq!(temperature_text(21.6), "22°");
        assert_eq!(temperature_text(3.4), "3°");
    }
}
