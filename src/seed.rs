//! Static route, stop and driver seed data for the Jaipur campus fleet.

use sqlx::SqlitePool;

struct RouteSeed {
    code: &'static str,
    name: &'static str,
    start: &'static str,
    end: &'static str,
    dep: &'static str,
    arr: &'static str,
    bus_no: &'static str,
    driver: &'static str,
    contact: &'static str,
    stops: &'static [StopSeed],
}

struct StopSeed {
    ord: i64,
    name: &'static str,
    eta: &'static str,
    lat: f64,
    lng: f64,
}

const ROUTE_SEEDS: &[RouteSeed] = &[
    RouteSeed {
        code: "R1",
        name: "Mansarovar Route",
        start: "Mansarovar Metro Station",
        end: "JKLU",
        dep: "07:45 AM",
        arr: "09:00 AM",
        bus_no: "RJ14AB1234",
        driver: "Ramesh Singh",
        contact: "+91 98765 43210",
        stops: &[
            StopSeed { ord: 1, name: "Mansarovar Metro Station", eta: "07:45 AM", lat: 26.8537, lng: 75.7695 },
            StopSeed { ord: 2, name: "Kiran Path Circle", eta: "07:55 AM", lat: 26.8461, lng: 75.7703 },
            StopSeed { ord: 3, name: "Gopalpura Bypass", eta: "08:10 AM", lat: 26.8780, lng: 75.7834 },
            StopSeed { ord: 4, name: "Mahapura", eta: "08:40 AM", lat: 26.8091, lng: 75.7369 },
            StopSeed { ord: 5, name: "JKLU", eta: "09:00 AM", lat: 26.7882, lng: 75.8018 },
        ],
    },
    RouteSeed {
        code: "R2",
        name: "Vaishali Nagar Route",
        start: "Queens Road, Vaishali Nagar",
        end: "JKLU",
        dep: "07:50 AM",
        arr: "09:00 AM",
        bus_no: "RJ14CD5678",
        driver: "Sunil Kumar",
        contact: "+91 98765 43211",
        stops: &[
            StopSeed { ord: 1, name: "Queens Road", eta: "07:50 AM", lat: 26.9000, lng: 75.7500 },
            StopSeed { ord: 2, name: "Amrapali Circle", eta: "08:00 AM", lat: 26.9115, lng: 75.7450 },
            StopSeed { ord: 3, name: "Ajmer Road (Sodala)", eta: "08:20 AM", lat: 26.9005, lng: 75.7802 },
            StopSeed { ord: 4, name: "Mahindra SEZ Gate", eta: "08:45 AM", lat: 26.7880, lng: 75.8000 },
            StopSeed { ord: 5, name: "JKLU", eta: "09:00 AM", lat: 26.7882, lng: 75.8018 },
        ],
    },
    RouteSeed {
        code: "R3",
        name: "Malviya Nagar Route",
        start: "GT Square, Malviya Nagar",
        end: "JKLU",
        dep: "08:00 AM",
        arr: "09:00 AM",
        bus_no: "RJ14EF9101",
        driver: "Sohan Lal",
        contact: "+91 98765 43212",
        stops: &[
            StopSeed { ord: 1, name: "GT Square", eta: "08:00 AM", lat: 26.8488, lng: 75.8167 },
            StopSeed { ord: 2, name: "Gaurav Tower", eta: "08:10 AM", lat: 26.8509, lng: 75.8087 },
            StopSeed { ord: 3, name: "Jawahar Circle", eta: "08:25 AM", lat: 26.8495, lng: 75.8034 },
            StopSeed { ord: 4, name: "Tonk Road", eta: "08:45 AM", lat: 26.8682, lng: 75.7934 },
            StopSeed { ord: 5, name: "JKLU", eta: "09:00 AM", lat: 26.7882, lng: 75.8018 },
        ],
    },
    RouteSeed {
        code: "R4",
        name: "Jagatpura Route",
        start: "Jagatpura Railway Station",
        end: "JKLU",
        dep: "08:05 AM",
        arr: "09:00 AM",
        bus_no: "RJ14GH4567",
        driver: "Arvind Yadav",
        contact: "+91 98765 43213",
        stops: &[
            StopSeed { ord: 1, name: "Jagatpura Railway Station", eta: "08:05 AM", lat: 26.8372, lng: 75.8590 },
            StopSeed { ord: 2, name: "Akshaya Patra Temple", eta: "08:15 AM", lat: 26.8349, lng: 75.8488 },
            StopSeed { ord: 3, name: "Mahal Road", eta: "08:35 AM", lat: 26.8281, lng: 75.8345 },
            StopSeed { ord: 4, name: "Mahapura", eta: "08:50 AM", lat: 26.8091, lng: 75.7369 },
            StopSeed { ord: 5, name: "JKLU", eta: "09:00 AM", lat: 26.7882, lng: 75.8018 },
        ],
    },
    RouteSeed {
        code: "R5",
        name: "Bani Park Route",
        start: "Bani Park Circle",
        end: "JKLU",
        dep: "07:40 AM",
        arr: "09:00 AM",
        bus_no: "RJ14IJ7890",
        driver: "Rajveer Singh",
        contact: "+91 98765 43214",
        stops: &[
            StopSeed { ord: 1, name: "Bani Park Circle", eta: "07:40 AM", lat: 26.9291, lng: 75.7924 },
            StopSeed { ord: 2, name: "Sindhi Camp", eta: "07:50 AM", lat: 26.9260, lng: 75.7949 },
            StopSeed { ord: 3, name: "Civil Lines", eta: "08:10 AM", lat: 26.9028, lng: 75.7853 },
            StopSeed { ord: 4, name: "Ajmer Road (DCM)", eta: "08:30 AM", lat: 26.8882, lng: 75.7734 },
            StopSeed { ord: 5, name: "JKLU", eta: "09:00 AM", lat: 26.7882, lng: 75.8018 },
        ],
    },
    RouteSeed {
        code: "R6",
        name: "C-Scheme Route",
        start: "M.I. Road (Ajmeri Gate)",
        end: "JKLU",
        dep: "07:55 AM",
        arr: "09:00 AM",
        bus_no: "RJ14KL4321",
        driver: "Mukesh Kumar",
        contact: "+91 98765 43215",
        stops: &[
            StopSeed { ord: 1, name: "M.I. Road (Ajmeri Gate)", eta: "07:55 AM", lat: 26.9189, lng: 75.8126 },
            StopSeed { ord: 2, name: "Panch Batti", eta: "08:05 AM", lat: 26.9128, lng: 75.8065 },
            StopSeed { ord: 3, name: "Ajmer Road (Gopalbari)", eta: "08:25 AM", lat: 26.9005, lng: 75.7902 },
            StopSeed { ord: 4, name: "Mahapura", eta: "08:45 AM", lat: 26.8091, lng: 75.7369 },
            StopSeed { ord: 5, name: "JKLU", eta: "09:00 AM", lat: 26.7882, lng: 75.8018 },
        ],
    },
];

/// Seed routes, stops and driver contacts. Idempotent: routes are keyed by
/// code, stops by (route_id, ord) and drivers by bus number. Returns how many
/// routes were newly created.
pub async fn seed_routes(pool: &SqlitePool) -> Result<u32, sqlx::Error> {
    let mut created = 0u32;
    for route in ROUTE_SEEDS {
        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM routes WHERE code = ?")
            .bind(route.code)
            .fetch_optional(pool)
            .await?;
        let route_id = match existing {
            Some(id) => id,
            None => {
                created += 1;
                sqlx::query_scalar::<_, i64>(
                    "INSERT INTO routes (code, name, start_point, end_point, dep_time, arr_time)
                     VALUES (?, ?, ?, ?, ?, ?)
                     RETURNING id",
                )
                .bind(route.code)
                .bind(route.name)
                .bind(route.start)
                .bind(route.end)
                .bind(route.dep)
                .bind(route.arr)
                .fetch_one(pool)
                .await?
            }
        };

        for stop in route.stops {
            sqlx::query(
                "INSERT OR IGNORE INTO stops (route_id, ord, name, eta, lat, lng)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(route_id)
            .bind(stop.ord)
            .bind(stop.name)
            .bind(stop.eta)
            .bind(stop.lat)
            .bind(stop.lng)
            .execute(pool)
            .await?;
        }

        sqlx::query(
            "INSERT INTO driver_info (bus_no, driver_name, contact) VALUES (?, ?, ?)
             ON CONFLICT(bus_no) DO UPDATE SET
                 driver_name = excluded.driver_name,
                 contact = excluded.contact",
        )
        .bind(route.bus_no)
        .bind(route.driver)
        .bind(route.contact)
        .execute(pool)
        .await?;
    }
    Ok(created)
}
